/*!
 * Tests for language and translate mode utilities
 */

use gagana::language_utils::{Language, TranslateMode};

#[test]
fn test_translateMode_languages_shouldMapEveryDirection() {
    let expected = [
        (TranslateMode::EnToSm, "en", "sm"),
        (TranslateMode::SmToEn, "sm", "en"),
        (TranslateMode::EnToCh, "en", "ch"),
        (TranslateMode::ChToEn, "ch", "en"),
    ];
    for (mode, source, target) in expected {
        assert_eq!(mode.source().code(), source, "source of {}", mode);
        assert_eq!(mode.target().code(), target, "target of {}", mode);
    }
}

#[test]
fn test_translateMode_fromStr_shouldRoundTripWireNames() {
    for mode in TranslateMode::ALL {
        assert_eq!(mode.as_str().parse::<TranslateMode>().unwrap(), mode);
    }
}

#[test]
fn test_translateMode_fromStr_shouldAcceptLegacyNames() {
    assert_eq!("toSamoan".parse::<TranslateMode>().unwrap(), TranslateMode::EnToSm);
    assert_eq!("toEnglish".parse::<TranslateMode>().unwrap(), TranslateMode::SmToEn);
}

#[test]
fn test_translateMode_fromStr_withUnknownMode_shouldFail() {
    assert!("enToFr".parse::<TranslateMode>().is_err());
    assert!("".parse::<TranslateMode>().is_err());
}

#[test]
fn test_language_name_shouldUseEnglishNames() {
    assert_eq!(Language::English.name(), "English");
    assert_eq!(Language::Samoan.name(), "Samoan");
    assert_eq!(Language::Chamorro.name(), "Chamorro");
}
