/// A document the assistant answers from, served by the web frontend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source {
    pub name: &'static str,
    pub filename: &'static str,
}

impl Source {
    /// Link to the document under the configured files URL
    pub fn url(&self, files_url: &str) -> String {
        format!("{}/{}", files_url.trim_end_matches('/'), self.filename)
    }
}

// There is no listing endpoint, so the indexed documents are known up front.
pub static KNOWN_SOURCES: [Source; 4] = [
    Source {
        name: "Air France Presentation",
        filename: "air-france-presentation.pdf",
    },
    Source {
        name: "Aeronautics Introduction",
        filename: "aeronautics-introduction.pdf",
    },
    Source {
        name: "Barfield TT1200A Specifications",
        filename: "barfield-tt1200a.pdf",
    },
    Source {
        name: "Attention Is All You Need",
        filename: "attention-is-all-you-need.pdf",
    },
];
