use super::{AnalysisFields, Analyzer, AnalyzerError};
use crate::crawler::extract_title;
use scraper::Html;
use serde_json::json;
use url::Url;

/// Records the page `<title>` and its length in characters
///
/// A missing title is stored as `null` with length 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleAnalyzer;

impl Analyzer for TitleAnalyzer {
    fn name(&self) -> &str {
        "title"
    }

    fn analyze(&self, document: &Html, _url: &Url) -> Result<AnalysisFields, AnalyzerError> {
        let title = extract_title(document);
        let length = title.as_ref().map(|t| t.chars().count()).unwrap_or(0);

        let mut fields = AnalysisFields::new();
        fields.insert("title".to_string(), json!(title));
        fields.insert("title_length".to_string(), json!(length));
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(html: &str) -> AnalysisFields {
        let document = Html::parse_document(html);
        let url = Url::parse("https://example.com/").unwrap();
        TitleAnalyzer.analyze(&document, &url).unwrap()
    }

    #[test]
    fn test_title_and_length() {
        let fields = analyze("<html><head><title> Café menu </title></head></html>");
        assert_eq!(fields["title"], json!("Café menu"));
        assert_eq!(fields["title_length"], json!(9));
    }

    #[test]
    fn test_missing_title() {
        let fields = analyze("<html><body>no title</body></html>");
        assert_eq!(fields["title"], serde_json::Value::Null);
        assert_eq!(fields["title_length"], json!(0));
    }
}
