//! Metadata lookup boundary.
//!
//! The scanner's output is an [`Isbn`]; callers turn it into a query for a
//! public book-metadata service and map the response into
//! [`BookCandidate`]s. The HTTP exchange itself lives with the caller;
//! this module owns the query text and the response mapping.

use crate::isbn::Isbn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors while mapping a lookup response.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("malformed lookup response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// What to look up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupQuery {
    /// Exact ISBN.
    Isbn(Isbn),
    /// Free-text title and/or author.
    TitleAuthor {
        /// Title words.
        title: String,
        /// Author words.
        author: String,
    },
}

impl LookupQuery {
    /// Query for a confirmed scan.
    pub fn for_isbn(isbn: &Isbn) -> Self {
        Self::Isbn(isbn.clone())
    }

    /// Free-text query.
    pub fn for_title_author(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self::TitleAuthor {
            title: title.into(),
            author: author.into(),
        }
    }

    /// Search expression in the volumes-search syntax (unencoded).
    pub fn to_query_string(&self) -> String {
        match self {
            Self::Isbn(isbn) => format!("isbn:{isbn}"),
            Self::TitleAuthor { title, author } => {
                let mut terms = Vec::with_capacity(2);
                if !title.trim().is_empty() {
                    terms.push(format!("intitle:{}", title.trim()));
                }
                if !author.trim().is_empty() {
                    terms.push(format!("inauthor:{}", author.trim()));
                }
                terms.join(" ")
            }
        }
    }
}

/// An author name split into family and given parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    /// Family name.
    pub family: String,
    /// Given name(s), possibly empty.
    pub given: String,
}

impl PersonName {
    /// Splits a display name.
    ///
    /// `"Last, First"` takes precedence; otherwise the final
    /// whitespace-delimited token is the family name.
    pub fn split(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some((family, given)) = raw.split_once(',') {
            return Self {
                family: family.trim().to_owned(),
                given: given.trim().to_owned(),
            };
        }
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        match tokens.split_last() {
            Some((family, given)) => Self {
                family: (*family).to_owned(),
                given: given.join(" "),
            },
            None => Self::default(),
        }
    }
}

/// One candidate record from a lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookCandidate {
    /// Title.
    pub title: String,
    /// Authors in listed order.
    pub authors: Vec<PersonName>,
    /// Publication date as given by the service.
    pub published_date: Option<String>,
    /// Publisher.
    pub publisher: Option<String>,
    /// ISBN-13, if the record lists one.
    pub isbn13: Option<Isbn>,
    /// Thumbnail image URL.
    pub thumbnail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: Vec<String>,
    published_date: Option<String>,
    publisher: Option<String>,
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

impl From<VolumeInfo> for BookCandidate {
    fn from(info: VolumeInfo) -> Self {
        let isbn13 = info
            .industry_identifiers
            .iter()
            .filter(|id| id.kind == "ISBN_13")
            .find_map(|id| Isbn::parse(&id.identifier).ok());
        let thumbnail = info
            .image_links
            .and_then(|links| links.thumbnail.or(links.small_thumbnail))
            .map(|url| match url.strip_prefix("http://") {
                Some(rest) => format!("https://{rest}"),
                None => url,
            });

        Self {
            title: info.title,
            authors: info.authors.iter().map(|a| PersonName::split(a)).collect(),
            published_date: info.published_date,
            publisher: info.publisher,
            isbn13,
            thumbnail,
        }
    }
}

/// Maps a volumes-search response body to candidates. A response without
/// items yields no candidates.
pub fn parse_volumes(json: &str) -> Result<Vec<BookCandidate>, LookupError> {
    let response: VolumesResponse = serde_json::from_str(json)?;
    Ok(response
        .items
        .into_iter()
        .map(|volume| BookCandidate::from(volume.volume_info))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_comma_form() {
        assert_eq!(
            PersonName::split("Kernighan, Brian W."),
            PersonName {
                family: "Kernighan".to_owned(),
                given: "Brian W.".to_owned()
            }
        );
    }

    #[test]
    fn test_split_last_token_is_family() {
        assert_eq!(
            PersonName::split("  Dennis  MacAlistair Ritchie "),
            PersonName {
                family: "Ritchie".to_owned(),
                given: "Dennis MacAlistair".to_owned()
            }
        );
        assert_eq!(PersonName::split("Plato").family, "Plato");
        assert_eq!(PersonName::split("Plato").given, "");
        assert_eq!(PersonName::split("   "), PersonName::default());
    }

    #[test]
    fn test_query_strings() {
        let isbn = Isbn::parse("9780131103627").unwrap();
        assert_eq!(LookupQuery::for_isbn(&isbn).to_query_string(), "isbn:9780131103627");
        assert_eq!(
            LookupQuery::for_title_author("The C Programming Language", "Kernighan")
                .to_query_string(),
            "intitle:The C Programming Language inauthor:Kernighan"
        );
        assert_eq!(LookupQuery::for_title_author("", " Ritchie ").to_query_string(), "inauthor:Ritchie");
    }

    #[test]
    fn test_parse_volumes() {
        let body = r#"{
            "kind": "books#volumes",
            "totalItems": 1,
            "items": [{
                "volumeInfo": {
                    "title": "The C Programming Language",
                    "authors": ["Brian W. Kernighan", "Ritchie, Dennis M."],
                    "publisher": "Prentice Hall",
                    "publishedDate": "1988",
                    "industryIdentifiers": [
                        {"type": "ISBN_10", "identifier": "0131103628"},
                        {"type": "ISBN_13", "identifier": "9780131103627"}
                    ],
                    "imageLinks": {"thumbnail": "http://books.example/cover.jpg"}
                }
            }]
        }"#;

        let books = parse_volumes(body).unwrap();
        assert_eq!(books.len(), 1);
        let book = &books[0];
        assert_eq!(book.title, "The C Programming Language");
        assert_eq!(book.authors[0].family, "Kernighan");
        assert_eq!(book.authors[1].given, "Dennis M.");
        assert_eq!(book.publisher.as_deref(), Some("Prentice Hall"));
        assert_eq!(book.published_date.as_deref(), Some("1988"));
        assert_eq!(book.isbn13.as_ref().map(Isbn::as_str), Some("9780131103627"));
        assert_eq!(book.thumbnail.as_deref(), Some("https://books.example/cover.jpg"));
    }

    #[test]
    fn test_no_items_is_empty() {
        assert!(parse_volumes(r#"{"kind": "books#volumes", "totalItems": 0}"#)
            .unwrap()
            .is_empty());
        assert!(matches!(parse_volumes("not json"), Err(LookupError::Malformed(_))));
    }

    #[test]
    fn test_sparse_volume() {
        let books = parse_volumes(r#"{"items": [{"volumeInfo": {"title": "Untitled"}}, {}]}"#).unwrap();
        assert_eq!(books.len(), 2);
        assert!(books[0].authors.is_empty());
        assert!(books[0].isbn13.is_none());
        assert!(books[1].title.is_empty());
    }
}
