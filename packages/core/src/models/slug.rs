//! Slug normalization

/// Turn arbitrary text into a URL slug
///
/// Lowercases, transliterates common Latin letters, replaces every run of
/// characters outside `[a-z0-9]` with a single `-`, and trims dashes from
/// both ends. May return an empty string.
pub fn normalize(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars().flat_map(char::to_lowercase) {
        let replacement = transliterate(c);
        let mapped: &str = match replacement {
            Some(ascii) => ascii,
            None if c.is_ascii_alphanumeric() => {
                push_segment(&mut slug, &mut pending_dash, c.encode_utf8(&mut [0; 4]));
                continue;
            }
            None => {
                pending_dash = true;
                continue;
            }
        };
        push_segment(&mut slug, &mut pending_dash, mapped);
    }

    slug
}

fn push_segment(slug: &mut String, pending_dash: &mut bool, segment: &str) {
    if *pending_dash && !slug.is_empty() {
        slug.push('-');
    }
    *pending_dash = false;
    slug.push_str(segment);
}

fn transliterate(c: char) -> Option<&'static str> {
    let ascii = match c {
        'ä' | 'æ' => "ae",
        'ö' | 'œ' => "oe",
        'ü' => "ue",
        'ß' => "ss",
        'à' | 'á' | 'â' | 'ã' | 'å' | 'ā' => "a",
        'ç' | 'č' | 'ć' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ñ' | 'ń' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ø' => "o",
        'ù' | 'ú' | 'û' => "u",
        'ý' | 'ÿ' => "y",
        'š' | 'ś' => "s",
        'ž' | 'ź' | 'ż' => "z",
        'ł' => "l",
        'đ' => "d",
        _ => return None,
    };
    Some(ascii)
}
