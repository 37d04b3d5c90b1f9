#![cfg(unix)]

mod common;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use demucs_bridge::{PredictError, Predictor, SeparationRequest};
use serde_json::json;
use tempfile::tempdir;

#[test]
fn predict_round_trips_base64_with_defaults() {
    let tmp = tempdir().unwrap();
    let stub = common::write_stub(tmp.path(), common::HAPPY_STUB);
    let scratch = tmp.path().join("scratch");

    let predictor = Predictor::new(common::stub_config(&stub, &scratch));

    // Stem and model fall back to their wire defaults when omitted.
    let req: SeparationRequest = serde_json::from_value(json!({
        "audio_content": BASE64.encode(b"fake audio"),
    }))
    .unwrap();
    assert_eq!(req.target_stem, "vocals");
    assert_eq!(req.model, "htdemucs");

    let resp = predictor.predict(&req).expect("predict");

    assert_eq!(
        BASE64.decode(&resp.vocal_audio).unwrap(),
        common::TARGET_BYTES
    );
    assert_eq!(
        BASE64.decode(&resp.bg_audio).unwrap(),
        common::RESIDUAL_BYTES
    );
    assert_eq!(resp.target_stem, "vocals");
    assert_eq!(resp.content_type, "audio/mp3");
    assert_eq!(common::entries(&scratch), 0);
}

#[test]
fn field_names_do_not_follow_the_stem() {
    let tmp = tempdir().unwrap();
    let stub = common::write_stub(tmp.path(), common::HAPPY_STUB);
    let scratch = tmp.path().join("scratch");

    let predictor = Predictor::new(common::stub_config(&stub, &scratch));
    let req = SeparationRequest {
        audio_content: BASE64.encode(b"fake audio"),
        target_stem: "drums".into(),
        model: "htdemucs".into(),
    };

    let resp = predictor.predict(&req).expect("predict");

    // `vocal_audio` still carries the target even when the target is drums.
    assert_eq!(resp.target_stem, "drums");
    assert_eq!(
        BASE64.decode(&resp.vocal_audio).unwrap(),
        common::TARGET_BYTES
    );
}

#[test]
fn invalid_base64_is_rejected_without_spawning() {
    let tmp = tempdir().unwrap();
    let stub = common::write_stub(tmp.path(), common::HAPPY_STUB);
    let scratch = tmp.path().join("scratch");

    let predictor = Predictor::new(common::stub_config(&stub, &scratch));
    let req = SeparationRequest {
        audio_content: "definitely not base64 !!!".into(),
        target_stem: "vocals".into(),
        model: "htdemucs".into(),
    };

    let err = predictor.predict(&req).unwrap_err();
    assert!(matches!(err, PredictError::Decode(_)), "{err:?}");
    assert!(
        !tmp.path().join("argv.txt").exists(),
        "tool must not run for undecodable input"
    );
}

#[test]
fn load_succeeds_when_the_tool_answers_help() {
    let tmp = tempdir().unwrap();
    let stub = common::write_stub(tmp.path(), common::HAPPY_STUB);
    let scratch = tmp.path().join("scratch");

    Predictor::load(common::stub_config(&stub, &scratch)).expect("load");
}

#[test]
fn load_fails_fast_when_the_tool_is_missing() {
    let cfg = demucs_bridge::SeparatorConfig {
        command: vec!["/definitely/not/here/demucs".into()],
        ..demucs_bridge::SeparatorConfig::default()
    };

    let err = Predictor::load(cfg).unwrap_err();
    match err {
        PredictError::Unavailable { command, detail } => {
            assert!(command.contains("--help"));
            assert!(detail.contains("not found"), "detail was: {detail}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn separation_failures_pass_through() {
    let tmp = tempdir().unwrap();
    let stub = common::write_stub(tmp.path(), common::FAIL_STUB);
    let scratch = tmp.path().join("scratch");

    let predictor = Predictor::new(common::stub_config(&stub, &scratch));
    let req = SeparationRequest {
        audio_content: BASE64.encode(b"fake audio"),
        target_stem: "vocals".into(),
        model: "htdemucs".into(),
    };

    let err = predictor.predict(&req).unwrap_err();
    assert!(
        err.to_string().contains("model weights for htdemucs2 not found"),
        "diagnostic lost: {err}"
    );
    assert_eq!(common::entries(&scratch), 0);
}
