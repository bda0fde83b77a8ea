use serde_json::{json, Value};

use crowdin_sync::codec::HtmlCodec;
use crowdin_sync::config::CodecConfig;
use crowdin_sync::document::Document;

fn article() -> Document {
    serde_json::from_value(json!({
        "_id": "drafts.article-1",
        "_type": "article",
        "_rev": "abc",
        "locale": "en",
        "title": "Ten <tips> & tricks",
        "rating": 4.5,
        "published": true,
        "subtitle": null,
        "tags": ["rust", "i18n"],
        "seo": { "_type": "seo", "description": "Short 'quoted' text", "internalNote": "do not translate" },
        "crowdinMetadata": { "_type": "crowdinMetadata", "sourceFileId": 7, "sourceDocId": "article-1" },
        "body": [
            {
                "_key": "k1",
                "_type": "block",
                "style": "normal",
                "children": [{ "_key": "c1", "_type": "span", "marks": [], "text": "First paragraph" }]
            }
        ],
    }))
    .unwrap()
}

#[test]
fn decode_of_encode_is_identity() {
    let codec = HtmlCodec::default();
    let document = article();
    let decoded = codec.decode(&codec.encode(&document).unwrap()).unwrap();
    assert_eq!(decoded, document);
}

#[test]
fn configured_hidden_fields_stay_out_of_the_visible_tree() {
    let config = CodecConfig {
        hidden_fields: vec!["internalNote".to_string()],
        hidden_objects: Vec::new(),
    };
    let codec = HtmlCodec::from_config(&config);
    let markup = codec.encode(&article()).unwrap();

    let visible = markup
        .split("</script>")
        .nth(1)
        .unwrap_or_default()
        .to_string();
    assert!(visible.contains("First paragraph"));
    assert!(!visible.contains("do not translate"));
    assert!(!visible.contains("sourceDocId"));

    let decoded = codec.decode(&markup).unwrap();
    assert_eq!(decoded.fields["seo"]["internalNote"], "do not translate");
}

#[test]
fn translated_text_replaces_only_visible_leaves() {
    let codec = HtmlCodec::default();
    let markup = codec.encode(&article()).unwrap();
    let (head, visible) = markup.split_at(markup.find("</script>").unwrap());
    let translated = format!(
        "{}{}",
        head,
        visible
            .replace("First paragraph", "Premier paragraphe")
            .replace("Ten &lt;tips&gt; &amp; tricks", "Dix astuces")
    );

    let decoded = codec.decode(&translated).unwrap();
    assert_eq!(decoded.fields["title"], "Dix astuces");
    assert_eq!(decoded.fields["body"][0]["children"][0]["text"], "Premier paragraphe");
    assert_eq!(decoded.fields["rating"], json!(4.5));
    assert_eq!(decoded.fields["tags"], json!(["rust", "i18n"]));
    assert_eq!(decoded.fields["subtitle"], Value::Null);
    assert_eq!(decoded.id, "drafts.article-1");
}

#[test]
fn markup_without_embedded_document_fails() {
    let codec = HtmlCodec::default();
    assert!(codec.decode("<html><body><div>text</div></body></html>").is_err());
}
