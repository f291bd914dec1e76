//! Greek phonetic and accent folding.
//!
//! Two passes are applied to the input:
//!
//! 1. Phonetic fold: letters and digraphs that sound alike collapse to one
//!    spelling (η/ω/υ, αι/ει/οι/υι, and αυ/ευ which become αβ/αφ and εβ/εφ
//!    depending on what follows).
//! 2. Accent fold: tonos and diaeresis are removed.
//!
//! The result is lower-cased. Folding can expose a new digraph (`εη` becomes
//! `ει`), so both passes repeat until the text stops changing; this keeps
//! `normalize(normalize(s)) == normalize(s)`.

/// First Greek code point the folds care about (`Ά`, U+0386).
pub const GREEK_THRESHOLD: char = '\u{0386}';

/// Stand-in for lookahead past the end of the input. Matches no rule.
const SENTINEL: char = '\0';

/// Returns true when `normalize` would have anything to do.
pub fn needs_normalization(text: &str) -> bool {
    text.chars().any(|c| c >= GREEK_THRESHOLD || c.is_uppercase())
}

/// Fold `text` to its phonetic, accent-free, lower-case form.
pub fn normalize(text: &str) -> String {
    if !needs_normalization(text) {
        return text.to_string();
    }

    // Every changing pass removes a character or replaces a foldable one,
    // so this bound is never reached in practice.
    let max_passes = text.chars().count() * 2 + 2;

    let mut current = fold_once(text);
    for _ in 0..max_passes {
        let next = fold_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn fold_once(text: &str) -> String {
    strip_accents(&phonetic_fold(text)).to_lowercase()
}

fn phonetic_fold(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let at = |i: usize| chars.get(i).copied().unwrap_or(SENTINEL);

    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c < GREEK_THRESHOLD {
            out.push(c);
            i += 1;
            continue;
        }

        let next = at(i + 1);
        match c {
            'α' | 'Α' | 'ε' | 'Ε' if is_upsilon(next) => {
                out.push(c);
                out.push(labial(next, at(i + 2), at(i + 3)));
                i += 2;
            }
            'α' | 'Α' if is_iota(next) => {
                out.push(alpha_iota(next));
                i += 2;
            }
            'ε' | 'Ε' | 'ο' | 'Ο' | 'υ' | 'Υ' if is_iota(next) => {
                out.push(next);
                i += 2;
            }
            _ => {
                out.push(fold_letter(c));
                i += 1;
            }
        }
    }
    out
}

fn is_upsilon(c: char) -> bool {
    matches!(c, 'υ' | 'ύ' | 'Υ' | 'Ύ')
}

fn is_iota(c: char) -> bool {
    matches!(c, 'ι' | 'ί' | 'Ι' | 'Ί')
}

/// αι sounds like ε; keep the accent and case of the ι.
fn alpha_iota(iota: char) -> char {
    match iota {
        'ί' => 'έ',
        'Ι' => 'Ε',
        'Ί' => 'Έ',
        _ => 'ε',
    }
}

/// The υ of αυ/ευ is voiced (β) before a voiced sound, voiceless (φ) otherwise.
fn labial(upsilon: char, after: char, after2: char) -> char {
    let upper = matches!(upsilon, 'Υ' | 'Ύ');
    match (is_loud(after, after2), upper) {
        (true, false) => 'β',
        (true, true) => 'Β',
        (false, false) => 'φ',
        (false, true) => 'Φ',
    }
}

fn is_loud(c: char, next: char) -> bool {
    match c {
        'α' | 'ά' | 'Α' | 'Ά' | 'ε' | 'έ' | 'Ε' | 'Έ' | 'η' | 'ή' | 'Η' | 'Ή' | 'ι' | 'ί' | 'ΐ'
        | 'ϊ' | 'Ι' | 'Ί' | 'Ϊ' | 'ο' | 'ό' | 'Ο' | 'Ό' | 'υ' | 'ύ' | 'ΰ' | 'ϋ' | 'Υ' | 'Ύ'
        | 'Ϋ' | 'ω' | 'ώ' | 'Ω' | 'Ώ' => true,
        'γ' | 'Γ' | 'β' | 'Β' | 'δ' | 'Δ' | 'ζ' | 'Ζ' | 'λ' | 'Λ' | 'μ' | 'Μ' | 'ν' | 'Ν' | 'ρ'
        | 'Ρ' => true,
        // τζ is pronounced voiced
        'τ' | 'Τ' => matches!(next, 'ζ' | 'Ζ'),
        _ => false,
    }
}

fn fold_letter(c: char) -> char {
    match c {
        'η' | 'υ' => 'ι',
        'ή' | 'ύ' => 'ί',
        'Η' | 'Υ' => 'Ι',
        'Ή' | 'Ύ' => 'Ί',
        'ω' => 'ο',
        'ώ' => 'ό',
        'Ω' => 'Ο',
        'Ώ' => 'Ό',
        other => other,
    }
}

fn strip_accents(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ά' => 'α',
            'Ά' => 'Α',
            'έ' => 'ε',
            'Έ' => 'Ε',
            'ή' => 'η',
            'Ή' => 'Η',
            'ί' | 'ΐ' | 'ϊ' => 'ι',
            'Ί' | 'Ϊ' => 'Ι',
            'ό' => 'ο',
            'Ό' => 'Ο',
            'ύ' | 'ΰ' | 'ϋ' => 'υ',
            'Ύ' | 'Ϋ' => 'Υ',
            'ώ' => 'ω',
            'Ώ' => 'Ω',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_upsilon_digraph_voicing() {
        // τ is voiceless, γ is voiced
        assert_eq!(normalize("αυτό"), "αφτο");
        assert_eq!(normalize("αυγό"), "αβγο");
        assert_eq!(normalize("ευχή"), "εφχι");
        assert_eq!(normalize("Ευρώπη"), "εβροπι");
    }

    #[test]
    fn test_tau_zeta_is_voiced() {
        assert_eq!(normalize("ατζ"), "ατζ");
        assert_eq!(normalize("αυτζ"), "αβτζ");
    }

    #[test]
    fn test_upsilon_digraph_at_end_is_voiceless() {
        assert_eq!(normalize("αυ"), "αφ");
        assert_eq!(normalize("ευ"), "εφ");
    }

    #[test]
    fn test_iota_digraphs() {
        assert_eq!(normalize("και"), "κε");
        assert_eq!(normalize("είναι"), "ινε");
        assert_eq!(normalize("οίκος"), "ικος");
        assert_eq!(normalize("υιός"), "ιος");
    }

    #[test]
    fn test_vowel_letters() {
        assert_eq!(normalize("ήλιος"), "ιλιος");
        assert_eq!(normalize("ώρα"), "ορα");
        assert_eq!(normalize("ύλη"), "ιλι");
    }

    #[test]
    fn test_uppercase_input() {
        assert_eq!(normalize("ΑΥΤΟΚΙΝΗΤΟ"), "αφτοκινιτο");
        assert_eq!(normalize("Αυτοκίνητο"), normalize("αφτοκινιτο"));
    }

    #[test]
    fn test_accents_and_diaeresis() {
        assert_eq!(normalize("ΐ"), "ι");
        assert_eq!(normalize("ϋ"), "ι");
        assert_eq!(normalize("Ά"), "α");
    }

    #[test]
    fn test_fast_path_unchanged() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("plain ascii"), "plain ascii");
        assert!(!needs_normalization("plain ascii"));
    }

    #[test]
    fn test_latin_is_lowercased() {
        assert_eq!(normalize("Hello αυτό"), "hello αφτο");
    }

    #[test]
    fn test_folding_reaches_fixed_point() {
        // η folds to ι, which then forms the ει digraph
        assert_eq!(normalize("εη"), "ι");
        assert_eq!(normalize(&normalize("εη")), normalize("εη"));
    }

    #[test]
    fn test_output_bounded() {
        let input = "αυαυαυ";
        assert!(normalize(input).chars().count() <= input.chars().count() * 4);
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(s in "[αάβγδεέζηήθιίϊΐκλμνξοόπρσςτυύϋΰφχψωώΑΆΒΓΔΕΈΖΗΉΘΙΊΪΚΛΜΝΞΟΌΠΡΣΤΥΎΫΦΧΨΩΏa-zA-Z0-9 ]{0,24}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_ascii_lowercase_passes_through(s in "[a-z0-9 ]{0,32}") {
            prop_assert_eq!(normalize(&s), s);
        }
    }
}
