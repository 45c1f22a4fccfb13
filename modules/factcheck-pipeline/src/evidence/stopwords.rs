//! Portuguese stopwords, already in normalized (lowercase, unaccented) form.

pub const PORTUGUESE: &[&str] = &[
    "a", "o", "os", "as", "um", "uma", "uns", "umas",
    "de", "do", "da", "dos", "das",
    "em", "no", "na", "nos", "nas",
    "por", "para", "com", "sem",
    "e", "ou", "mas", "que",
    "foi", "sao", "ser",
    "ao", "aos",
    "como", "mais", "menos",
    "isso", "esse", "essa", "este", "esta",
    "ja", "tambem", "sobre", "entre",
];
