use redis_lite::commands::CommandError;

use crate::test_utils::{TestEnv, TestUtils};

#[tokio::test]
async fn test_handle_echo_command() {
    let env = TestEnv::new_master_server();

    env.exec_command_success_response(&["ECHO", "hello"], vec![TestUtils::simple_string("hello")])
        .await;
    env.exec_command_success_response(&["echo", "MiXeD"], vec![TestUtils::simple_string("MiXeD")])
        .await;
}

#[tokio::test]
async fn test_handle_echo_command_wrong_arity() {
    let env = TestEnv::new_master_server();

    let test_cases = vec![vec!["ECHO"], vec!["ECHO", "hello", "world"]];

    for command in test_cases {
        env.exec_command_error_response(&command, CommandError::WrongNumberOfArguments)
            .await;
    }
}

#[tokio::test]
async fn test_handle_echo_command_with_line_breaks() {
    let env = TestEnv::new_master_server();

    env.exec_command_success_response(&["ECHO", "va\r\nl"], vec![TestUtils::bulk_string("va\r\nl")])
        .await;
}
