//! Link resolution against the document index and link graph assignment.

use kiln_core::{Document, DocumentId, DocumentIndex, Link, LinkResolver, assign_links};
use pretty_assertions::assert_eq;
use url::Url;

fn resolver() -> LinkResolver {
    LinkResolver::new(&Url::parse("https://mysite.test/").unwrap())
}

fn resolve_everything(documents: &[Document]) -> Vec<Link> {
    let index = DocumentIndex::from_documents(documents);
    let resolver = resolver();
    documents
        .iter()
        .flat_map(|doc| resolver.resolve_all(&index, doc, doc.hrefs.iter().map(String::as_str)))
        .collect()
}

#[test]
fn test_slug_and_href_forms_resolve_to_same_document() {
    let mut target = Document::from_source("a/b.md", "");
    target.set_slug("a/b");
    let source = Document::from_source("other.md", "");
    let index = DocumentIndex::from_documents(&[target, source.clone()]);
    let resolver = resolver();

    for raw in ["/a/b", "/a/b/", "/A/B"] {
        let link = resolver.resolve(&index, &source, raw).unwrap();
        assert!(link.internal, "{raw} should be internal");
        assert_eq!(link.target, Some(DocumentId::new("a/b.md")), "{raw}");
    }

    for raw in ["a/b", "/a/b", "/a/b/", "A/B"] {
        assert_eq!(
            index.resolve_path(raw).map(|d| d.id()),
            Some(DocumentId::new("a/b.md")),
            "{raw}"
        );
    }
}

#[test]
fn test_bare_relative_targets_from_site_root() {
    let mut target = Document::from_source("a/b.md", "");
    target.set_slug("a/b");
    let mut home = Document::from_source("index.md", "");
    home.set_slug("");
    assert_eq!(home.href, "/");
    let index = DocumentIndex::from_documents(&[target, home.clone()]);
    let resolver = resolver();

    for raw in ["a/b", "a/b/", "A/B"] {
        let link = resolver.resolve(&index, &home, raw).unwrap();
        assert!(link.internal, "{raw} should be internal");
        assert_eq!(link.target, Some(DocumentId::new("a/b.md")), "{raw}");
    }
}

#[test]
fn test_other_host_is_external() {
    let source = Document::from_source("a.md", "");
    let index = DocumentIndex::from_documents(std::slice::from_ref(&source));

    let link = resolver()
        .resolve(&index, &source, "https://external.test/x")
        .unwrap();

    assert!(!link.internal);
    assert_eq!(link.target, None);
    assert_eq!(link.target_url, "https://external.test/x");
}

#[test]
fn test_same_host_absolute_url_is_internal() {
    let source = Document::from_source("a.md", "");
    let target = Document::from_source("b.md", "");
    let index = DocumentIndex::from_documents(&[source.clone(), target]);

    let link = resolver()
        .resolve(&index, &source, "https://MYSITE.test/b/")
        .unwrap();

    assert!(link.internal);
    assert_eq!(link.target, Some(DocumentId::new("b.md")));
}

#[test]
fn test_repeated_links_deduplicate() {
    let mut source = Document::from_source("source.md", "");
    source.hrefs = vec![
        "/target/".to_owned(),
        "/target/#intro".to_owned(),
        "../target/".to_owned(),
    ];
    let target = Document::from_source("target.md", "");
    let mut documents = vec![source, target];

    let links = resolve_everything(&documents);
    assert_eq!(links.len(), 3);
    assign_links(&mut documents, links);

    let [source, target] = documents.as_slice() else {
        panic!("expected two documents");
    };
    assert_eq!(source.outlinks.len(), 1);
    assert_eq!(source.outlinks[0].target_url, "https://mysite.test/target/");
    assert_eq!(target.inlinks.len(), 1);
    assert_eq!(target.inlinks[0].source_url, "https://mysite.test/source/");
    assert!(source.inlinks.is_empty());
    assert!(target.outlinks.is_empty());
}

#[test]
fn test_index_and_post_scenario() {
    let index_doc = Document::from_source("index.md", "");
    let mut post = Document::from_source("post.md", "");
    post.hrefs = vec!["/index/".to_owned(), "/post/".to_owned()];
    let mut documents = vec![index_doc, post];

    let links = resolve_everything(&documents);
    assign_links(&mut documents, links);

    let index_doc = &documents[0];
    let post = &documents[1];
    assert_eq!(index_doc.inlinks.len(), 1);
    assert_eq!(index_doc.inlinks[0].source, DocumentId::new("post.md"));
    assert!(post.inlinks.is_empty());
    assert_eq!(post.outlinks.len(), 1);
    assert_eq!(post.outlinks[0].target, Some(DocumentId::new("index.md")));
}

#[test]
fn test_assign_links_replaces_previous_graph() {
    let mut a = Document::from_source("a.md", "");
    a.hrefs = vec!["/b/".to_owned()];
    let b = Document::from_source("b.md", "");
    let mut documents = vec![a, b];

    let links = resolve_everything(&documents);
    assign_links(&mut documents, links.clone());
    assign_links(&mut documents, links);

    assert_eq!(documents[0].outlinks.len(), 1);
    assert_eq!(documents[1].inlinks.len(), 1);
}
