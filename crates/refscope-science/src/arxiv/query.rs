/// A boolean-AND arXiv search built from labeled terms (`all`, `ti`, `au`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArxivQuery {
    terms: Vec<(String, String)>,
}

impl ArxivQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search every field for `value`.
    pub fn all(value: &str) -> Self {
        Self::new().term("all", value)
    }

    /// Add a labeled term. Blank values are ignored.
    pub fn term(mut self, label: &str, value: &str) -> Self {
        if !value.trim().is_empty() {
            self.terms.push((label.to_string(), value.to_string()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Every word of every term, lower-cased and prefixed with its label,
    /// joined with `+AND+`.
    pub fn to_query_string(&self) -> String {
        self.terms
            .iter()
            .flat_map(|(label, value)| {
                value
                    .to_lowercase()
                    .split_whitespace()
                    .map(|word| format!("{label}:{}", urlencoding::encode(word)))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
            .join("+AND+")
    }
}
