use std::time::Duration;

use bytes::Bytes;
use redis_lite::{commands::CommandError, resp::RespValue};

use crate::test_utils::TestEnv;

#[tokio::test]
async fn test_handle_set_command() {
    let env = TestEnv::new_master_server();

    env.exec_command_success_response(&["SET", "grape", "mango"], vec![RespValue::ok()])
        .await;

    let mut store_guard = env.get_store().await;
    assert_eq!(store_guard.get(b"grape"), Some(Bytes::from("mango")));
}

#[tokio::test]
async fn test_handle_set_command_overwrites() {
    let env = TestEnv::new_master_server();

    env.exec_command_success_response(&["SET", "grape", "mango", "px", "10"], vec![RespValue::ok()])
        .await;
    env.exec_command_success_response(&["SET", "grape", "kiwi"], vec![RespValue::ok()])
        .await;

    let mut store_guard = env.get_store().await;
    assert_eq!(store_guard.get(b"grape"), Some(Bytes::from("kiwi")));
}

#[tokio::test(start_paused = true)]
async fn test_handle_set_command_with_expiration() {
    let env = TestEnv::new_master_server();

    env.exec_command_success_response(&["SET", "grape", "mango", "PX", "100"], vec![RespValue::ok()])
        .await;

    tokio::time::advance(Duration::from_millis(99)).await;
    assert_eq!(env.get_store().await.get(b"grape"), Some(Bytes::from("mango")));

    tokio::time::advance(Duration::from_millis(1)).await;
    assert_eq!(env.get_store().await.get(b"grape"), None);
    assert!(env.get_store().await.is_empty());
}

#[tokio::test]
async fn test_handle_set_command_keeps_case_of_arguments() {
    let env = TestEnv::new_master_server();

    env.exec_command_success_response(&["set", "Grape", "MANGO"], vec![RespValue::ok()])
        .await;

    let mut store_guard = env.get_store().await;
    assert_eq!(store_guard.get(b"Grape"), Some(Bytes::from("MANGO")));
    assert_eq!(store_guard.get(b"grape"), None);
}

#[tokio::test]
async fn test_handle_set_command_ignores_unknown_options() {
    let env = TestEnv::new_master_server();

    env.exec_command_success_response(&["SET", "grape", "mango", "EX", "10"], vec![RespValue::ok()])
        .await;

    let store_guard = env.get_store().await;
    assert!(store_guard.contains_key(b"grape"));
}

#[tokio::test]
async fn test_handle_set_command_invalid() {
    let env = TestEnv::new_master_server();

    let test_cases = vec![
        (vec!["SET"], CommandError::WrongNumberOfArguments),
        (vec!["SET", "grape"], CommandError::WrongNumberOfArguments),
        (vec!["SET", "grape", "mango", "PX"], CommandError::InvalidExpiration),
        (
            vec!["SET", "grape", "mango", "PX", "soon"],
            CommandError::InvalidExpiration,
        ),
        (
            vec!["SET", "grape", "mango", "PX", "-5"],
            CommandError::InvalidExpiration,
        ),
    ];

    for (command, expected_error) in test_cases {
        env.exec_command_error_response(&command, expected_error).await;
    }

    assert!(env.get_store().await.is_empty());
}
