mod common;

use classroom_core::{
    observer::ObserverError,
    persona::SpeakerId,
    playback::Phase,
    turn::TurnKind,
};
use common::*;
use std::time::Duration;

fn provider() -> CannedProvider {
    let mut provider = CannedProvider::new(
        vec![slide("Light", "Plants catch sunlight with their leaves.")],
        vec![
            said("ali", "Ali", "So leaves are solar panels!", TurnKind::Answer),
            said("teacher", "Mr. Nova", "Exactly. Class dismissed!", TurnKind::Closing),
        ],
    );
    provider.observer_reply = Some(vec![
        said("teacher", "Mr. Nova", "Chlorophyll is the green pigment, Sam.", TurnKind::Answer),
        said("rana", "Rana", "It is so beautiful that plants can do that.", TurnKind::Comment),
    ]);
    provider.observer_delay = Duration::from_millis(800);
    provider
}

#[tokio::test(start_paused = true)]
async fn test_observer_message_is_recorded_then_answered() {
    let class = classroom(provider());
    class.start();
    wait_for(&class, |s| s.phase == Phase::Interlude).await;
    class.pause();

    let before = class.transcript().len();
    let turn = class.send_observer_message("Sam", "what is chlorophyll?").unwrap();
    let transcript = class.transcript();
    assert_eq!(transcript.len(), before + 1, "the observer's own message lands immediately");
    assert_eq!(transcript[before].id, turn.message.id);
    assert_eq!(turn.message.turn.speaker_id, SpeakerId::observer());
    assert_eq!(turn.message.turn.speaker_name, "Sam");
    assert_eq!(turn.message.turn.text, "what is chlorophyll?");

    let replies = turn.replies.await.unwrap();
    assert!((1..=2).contains(&replies.len()));
    let allowed = ["teacher", "ali", "kirtan", "tayyab", "rana"];
    for reply in &replies {
        assert!(allowed.contains(&reply.turn.speaker_id.as_str()));
    }
    assert_eq!(class.transcript().len(), before + 1 + replies.len());
    // Only the teacher's reply goes on the board.
    let board = class.playback().board;
    assert_eq!(board.heading, "Responding to Sam");
    assert_eq!(board.text, "Chlorophyll is the green pigment, Sam.");
}

#[tokio::test(start_paused = true)]
async fn test_second_message_is_rejected_while_a_reply_is_in_flight() {
    let class = classroom(provider());
    class.start();
    class.pause();

    let first = class.send_observer_message("Sam", "what is chlorophyll?").unwrap();
    assert!(class.observer_busy());
    assert_eq!(
        class.send_observer_message("Sam", "and what about roots?").unwrap_err(),
        ObserverError::Busy
    );

    first.replies.await.unwrap();
    assert!(!class.observer_busy());
    assert!(class.send_observer_message("Sam", "and what about roots?").is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_provider_failure_falls_back_and_reenables_input() {
    let mut failing = provider();
    failing.observer_reply = None;
    let class = classroom(failing);
    class.pause();

    let turn = class.send_observer_message("Sam", "why?").unwrap();
    let replies = turn.replies.await.unwrap();
    assert_eq!(replies.len(), 2);
    assert!(replies[0].turn.text.contains("Sam"));
    assert!(!class.observer_busy());
}

#[tokio::test(start_paused = true)]
async fn test_blank_input_and_ended_class_are_rejected() {
    let class = classroom(provider());
    assert_eq!(
        class.send_observer_message("Sam", "   ").unwrap_err(),
        ObserverError::EmptyMessage
    );
    assert_eq!(class.join_observer(" ").unwrap_err(), ObserverError::EmptyName);

    class.end_class();
    assert_eq!(
        class.send_observer_message("Sam", "hello?").unwrap_err(),
        ObserverError::ClassOver
    );
    assert!(class.transcript().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_end_class_drops_a_pending_reply() {
    let class = classroom(provider());
    class.pause();
    let turn = class.send_observer_message("Sam", "what is chlorophyll?").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    class.end_class();

    assert!(turn.replies.await.unwrap().is_empty());
    assert_eq!(class.transcript().len(), 1);
    assert!(!class.observer_busy());
}

#[tokio::test(start_paused = true)]
async fn test_joining_observer_is_welcomed_by_the_teacher() {
    let voice = RecordingVoice::new(Duration::from_millis(10));
    let class = classroom_with_voice(provider(), voice.clone());
    class.pause();

    let welcome = class.join_observer("Sam").unwrap();
    assert_eq!(welcome.turn.speaker_id, SpeakerId::teacher());
    assert!(welcome.turn.text.contains("Sam"));
    assert_eq!(class.transcript().len(), 1);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(voice.spoken().iter().any(|s| s.contains("Welcome!")));
}

#[tokio::test(start_paused = true)]
async fn test_observer_replies_run_alongside_the_main_loop() {
    let class = classroom(provider());
    class.start();
    let turn = class.send_observer_message("Sam", "what is chlorophyll?").unwrap();
    turn.replies.await.unwrap();
    class.wait_finished().await;

    let transcript = class.transcript();
    let sequences: Vec<usize> = transcript.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, (0..transcript.len()).collect::<Vec<_>>());
    assert_eq!(transcript.len(), 1 + 3 + 2);
}
