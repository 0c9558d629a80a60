//! Funny guest-name generator for guests who skip typing their own.
//!
//! Names are an adjective/noun pair drawn from fixed word lists, so every
//! generated name passes guest-name validation and the classifier can tell
//! generated names apart from typed ones.

use rand::seq::SliceRandom;

const ADJECTIVES: &[&str] = &[
    "Caffeinated",
    "Decaf",
    "Frothy",
    "Roasty",
    "Steamy",
    "Velvety",
    "Smoky",
    "Perky",
    "Drowsy",
    "Jittery",
    "Toasty",
    "Silky",
    "Bold",
    "Mellow",
    "Nutty",
    "Spiced",
    "Whipped",
    "Iced",
    "Brewed",
    "Crema",
];

const NOUNS: &[&str] = &[
    "Wombat",
    "Alpaca",
    "Capuchin",
    "Otter",
    "Hedgehog",
    "Narwhal",
    "Quokka",
    "Pangolin",
    "Axolotl",
    "Lemur",
    "Marmot",
    "Puffin",
    "Gecko",
    "Heron",
    "Badger",
    "Ocelot",
    "Tapir",
    "Ibex",
    "Kestrel",
    "Manatee",
];

/// A random "Adjective Noun" guest name, e.g. "Frothy Narwhal".
pub fn generate_funny_guest_name() -> String {
    let mut rng = rand::thread_rng();
    // The lists are non-empty constants, so choose() cannot fail.
    let adjective = ADJECTIVES.choose(&mut rng).unwrap_or(&ADJECTIVES[0]);
    let noun = NOUNS.choose(&mut rng).unwrap_or(&NOUNS[0]);
    format!("{adjective} {noun}")
}

/// Whether a name looks like one this module generated: exactly two words,
/// the first from the adjective list and the second from the noun list
/// (case-insensitive). Ordinary human names fall outside the word lists.
pub fn is_generated_funny_name(name: &str) -> bool {
    let mut words = name.split_whitespace();
    let (first, second) = match (words.next(), words.next(), words.next()) {
        (Some(a), Some(b), None) => (a, b),
        _ => return false,
    };
    ADJECTIVES.iter().any(|a| a.eq_ignore_ascii_case(first))
        && NOUNS.iter().any(|n| n.eq_ignore_ascii_case(second))
}
