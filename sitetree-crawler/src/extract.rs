use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::Receiver;

use bytes::Bytes;
use lol_html::{element, text, HtmlRewriter, Settings};

use crate::link::{classify, LinkKind};

/// An anchor pulled out of a page, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub href: String,
    pub text: String,
    pub kind: LinkKind,
}

/// Result of draining one page through the extractor.
///
/// `links` holds everything found up to the point of failure, so a
/// mid-document error never discards the work already done.
#[derive(Debug, Default)]
pub struct ExtractOutcome {
    pub links: Vec<ExtractedLink>,
    pub error: Option<String>,
}

/// Extracts anchor links from a stream of HTML chunks without building a DOM.
///
/// The rewriter tokenizes each chunk as it arrives. An opening `<a>` tag that
/// carries attributes becomes the pending link (its href classified
/// immediately, empty if absent); the first non-empty text run inside any
/// anchor completes the pending link and emits it. An anchor whose text never
/// arrives before it closes is dropped, and an attribute-less `<a>` is
/// ignored outright.
///
/// Runs synchronously and is fed from the network side through a channel, so
/// it belongs on a blocking thread (`tokio::task::spawn_blocking`).
pub fn extract_links(body: Receiver<Bytes>) -> ExtractOutcome {
    let found: Rc<RefCell<Vec<ExtractedLink>>> = Rc::new(RefCell::new(Vec::new()));
    let pending: Rc<RefCell<Option<ExtractedLink>>> = Rc::new(RefCell::new(None));

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("a", {
                    let pending = pending.clone();
                    move |el| {
                        if el.attributes().is_empty() {
                            return Ok(());
                        }
                        let href = el.get_attribute("href").unwrap_or_default();
                        let kind = classify(&href);
                        *pending.borrow_mut() = Some(ExtractedLink {
                            href,
                            text: String::new(),
                            kind,
                        });
                        Ok(())
                    }
                }),
                text!("a", {
                    let pending = pending.clone();
                    let found = found.clone();
                    move |t| {
                        if t.as_str().is_empty() {
                            return Ok(());
                        }
                        if let Some(mut link) = pending.borrow_mut().take() {
                            link.text = t.as_str().to_string();
                            found.borrow_mut().push(link);
                        }
                        Ok(())
                    }
                }),
            ],
            ..Settings::default()
        },
        |_: &[u8]| {},
    );

    let mut failed = None;
    for chunk in body {
        if let Err(e) = rewriter.write(&chunk) {
            failed = Some(e.to_string());
            break;
        }
    }
    let error = match failed {
        Some(e) => {
            drop(rewriter);
            Some(e)
        }
        None => rewriter.end().err().map(|e| e.to_string()),
    };

    ExtractOutcome {
        links: found.take(),
        error,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    fn extract_parts(parts: &[&str]) -> ExtractOutcome {
        let (tx, rx) = mpsc::channel();
        for part in parts {
            tx.send(Bytes::copy_from_slice(part.as_bytes())).unwrap();
        }
        drop(tx);
        extract_links(rx)
    }

    #[test]
    fn collects_anchors_in_document_order() {
        let outcome = extract_parts(&[
            r#"<html><body><a href="/page1">P1</a><a href="/page2">P2</a><a href="/page3">P3</a></body></html>"#,
        ]);
        assert!(outcome.error.is_none());
        let hrefs: Vec<&str> = outcome.links.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(hrefs, vec!["/page1", "/page2", "/page3"]);
        assert_eq!(outcome.links[0].text, "P1");
        assert_eq!(outcome.links[0].kind, LinkKind::Path);
    }

    #[test]
    fn classifies_each_href_as_it_is_found() {
        let outcome = extract_parts(&[concat!(
            r#"<a href="https://example.org/">E</a>"#,
            r#"<a href="/p">P</a>"#,
            r##"<a href="#frag">F</a>"##,
            r#"<a href="other.html">O</a>"#,
        )]);
        let kinds: Vec<LinkKind> = outcome.links.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LinkKind::Page,
                LinkKind::Path,
                LinkKind::Hash,
                LinkKind::Unknown
            ]
        );
    }

    #[test]
    fn survives_chunk_boundaries_inside_tags() {
        let outcome = extract_parts(&["<a hre", r#"f="/split">S"#, "plit</a>"]);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.links.len(), 1);
        assert_eq!(outcome.links[0].href, "/split");
        assert_eq!(outcome.links[0].kind, LinkKind::Path);
    }

    #[test]
    fn ignores_anchors_without_attributes() {
        let outcome = extract_parts(&[r#"<a>bare</a><a href="/kept">Kept</a>"#]);
        assert_eq!(outcome.links.len(), 1);
        assert_eq!(outcome.links[0].href, "/kept");
    }

    #[test]
    fn drops_anchors_whose_text_never_arrives() {
        let outcome = extract_parts(&[r#"<a href="/silent"></a><a href="/spoken">Hi</a>"#]);
        assert_eq!(outcome.links.len(), 1);
        assert_eq!(outcome.links[0].href, "/spoken");
        assert_eq!(outcome.links[0].text, "Hi");
    }

    #[test]
    fn keeps_anchors_with_attributes_but_no_href() {
        let outcome = extract_parts(&[r#"<a name="top">Top</a>"#]);
        assert_eq!(outcome.links.len(), 1);
        assert_eq!(outcome.links[0].href, "");
        assert_eq!(outcome.links[0].kind, LinkKind::Unknown);
        assert_eq!(outcome.links[0].text, "Top");
    }

    #[test]
    fn takes_first_text_run_from_nested_markup() {
        let outcome = extract_parts(&[r#"<a href="/x"><b>Bold</b> tail</a>"#]);
        assert_eq!(outcome.links.len(), 1);
        assert_eq!(outcome.links[0].text, "Bold");
    }

    #[test]
    fn empty_stream_yields_nothing() {
        let outcome = extract_parts(&[]);
        assert!(outcome.links.is_empty());
        assert!(outcome.error.is_none());
    }
}
