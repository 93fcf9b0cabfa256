#![no_main]

use libfuzzer_sys::fuzz_target;
use locker_catch::{
    combined_text, extract_fallback_name, extract_identity_hint, extract_subject_name,
    is_catch_text, CATCH_SUBJECT_FALLBACK,
};
use locker_core::EmbedText;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let middle = raw
        .char_indices()
        .map(|(index, _)| index)
        .nth(raw.chars().count() / 2)
        .unwrap_or(raw.len());
    let (content, embed_body) = raw.split_at(middle);
    let embeds = [EmbedText {
        title: None,
        description: Some(embed_body.to_string()),
        fields: Vec::new(),
    }];
    let text = combined_text(content, &embeds);

    let subject = extract_subject_name(&text);
    assert_eq!(subject, subject.trim());
    if !text.to_lowercase().contains("caught") {
        assert_eq!(subject, CATCH_SUBJECT_FALLBACK);
    }
    if let Some(name) = extract_fallback_name(&text) {
        assert!(!name.is_empty());
        assert!(!name.contains(char::is_whitespace));
    }
    let _ = extract_identity_hint(&text);
    let _ = is_catch_text(&text);
});
