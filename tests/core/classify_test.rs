//! Classification precedence: image, then voice, then text.

use relay_bridge::classify::{classify, is_image, is_voice, MessageKind};

use crate::fixtures::{audio, file, image};

#[test]
fn empty_set_is_text() {
    assert_eq!(classify(&[]), MessageKind::Text);
}

#[test]
fn single_image_is_image() {
    let attachments = vec![image("https://x/1.png", "image/png")];
    assert_eq!(classify(&attachments), MessageKind::Image);
}

#[test]
fn image_wins_over_audio_regardless_of_order() {
    let audio_first = vec![
        audio("memo.ogg", Some("audio/ogg")),
        image("https://x/1.png", "image/png"),
    ];
    let image_first = vec![
        image("https://x/1.png", "image/png"),
        audio("memo.ogg", Some("audio/ogg")),
    ];
    assert_eq!(classify(&audio_first), MessageKind::Image);
    assert_eq!(classify(&image_first), MessageKind::Image);
}

#[test]
fn audio_content_type_is_voice() {
    let attachments = vec![audio("recording", Some("audio/mpeg"))];
    assert_eq!(classify(&attachments), MessageKind::Voice);
}

#[test]
fn voice_extension_without_content_type_is_voice() {
    for name in ["voice-message.ogg", "a.MP3", "clip.Wav", "x.webm"] {
        let attachments = vec![audio(name, None)];
        assert_eq!(classify(&attachments), MessageKind::Voice, "filename {name}");
    }
}

#[test]
fn voice_extension_with_unrelated_content_type_is_voice() {
    let attachments = vec![audio("clip.webm", Some("video/webm"))];
    assert_eq!(classify(&attachments), MessageKind::Voice);
}

#[test]
fn voice_found_beyond_first_attachment() {
    let attachments = vec![
        file("report.pdf", Some("application/pdf")),
        audio("memo.ogg", None),
    ];
    assert_eq!(classify(&attachments), MessageKind::Voice);
}

#[test]
fn image_found_beyond_first_attachment() {
    let attachments = vec![
        file("report.pdf", Some("application/pdf")),
        image("https://x/2.jpg", "image/jpeg"),
    ];
    assert_eq!(classify(&attachments), MessageKind::Image);
}

#[test]
fn other_attachments_are_text() {
    let attachments = vec![
        file("report.pdf", Some("application/pdf")),
        file("notes.txt", None),
        file("movie.mp4", Some("video/mp4")),
    ];
    assert_eq!(classify(&attachments), MessageKind::Text);
}

#[test]
fn image_extension_without_content_type_is_not_image() {
    // Only the declared type identifies images.
    let attachments = vec![file("photo.png", None)];
    assert!(!is_image(&attachments[0]));
    assert_eq!(classify(&attachments), MessageKind::Text);
}

#[test]
fn predicates_are_independent() {
    let pic = image("https://x/1.png", "image/png");
    let memo = audio("memo.ogg", Some("audio/ogg"));
    assert!(is_image(&pic));
    assert!(!is_voice(&pic));
    assert!(is_voice(&memo));
    assert!(!is_image(&memo));
}
