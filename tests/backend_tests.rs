use dockswitch::domain::{
    BackendError, CommandOutput, ContainerBackend, ContainerState, SwitchState,
};
use dockswitch::test_support::ScriptedExecutor;
use dockswitch::ShellBackend;
use std::sync::Arc;

const LIST: &str = "docker ps -a --format '{{.Names}}:{{.State}}'";

fn create_backend() -> (ShellBackend, Arc<ScriptedExecutor>) {
    let executor = Arc::new(ScriptedExecutor::new());
    let backend = ShellBackend::new(executor.clone());
    (backend, executor)
}

#[tokio::test]
async fn listing_parses_and_projects() {
    let (backend, executor) = create_backend();
    executor.respond_ok(LIST, "web:running\nworker:exited");

    let statuses = backend.list_statuses().await.unwrap();
    assert_eq!(statuses["web"], ContainerState::Running);
    assert_eq!(statuses["worker"], ContainerState::Exited);
    assert_eq!(statuses["web"].switch_state(), SwitchState::On);
    assert_eq!(statuses["worker"].switch_state(), SwitchState::Off);
}

#[tokio::test]
async fn malformed_listing_fails_the_cycle() {
    let (backend, executor) = create_backend();
    executor.respond_ok(LIST, "web:running\nnot-a-pair");

    assert!(matches!(
        backend.list_statuses().await,
        Err(BackendError::MalformedOutput(_))
    ));
}

#[tokio::test]
async fn listing_failure_is_unavailable() {
    let (backend, executor) = create_backend();
    executor.respond(
        LIST,
        CommandOutput {
            stdout: String::new(),
            stderr: "Cannot connect to the Docker daemon".into(),
            success: false,
        },
    );

    assert!(matches!(
        backend.list_statuses().await,
        Err(BackendError::Unavailable(_))
    ));
}

#[tokio::test]
async fn start_runs_the_docker_cli() {
    let (backend, executor) = create_backend();
    executor.respond_ok("docker start web", "web");

    backend.start("web").await.unwrap();
    assert_eq!(executor.commands(), vec!["docker start web"]);
}

#[tokio::test]
async fn start_of_unknown_container_is_not_found() {
    let (backend, executor) = create_backend();
    executor.respond(
        "docker start ghost",
        CommandOutput {
            stdout: String::new(),
            stderr: "Error response from daemon: No such container: ghost".into(),
            success: false,
        },
    );

    assert!(matches!(
        backend.start("ghost").await,
        Err(BackendError::NotFound(_))
    ));
}

#[tokio::test]
async fn invalid_names_never_reach_the_shell() {
    let (backend, executor) = create_backend();

    assert!(matches!(
        backend.start("evil/name").await,
        Err(BackendError::InvalidName(_))
    ));
    assert!(matches!(
        backend.stop("a:b").await,
        Err(BackendError::InvalidName(_))
    ));
    assert!(executor.commands().is_empty());
}

#[tokio::test]
async fn status_queries_inspect() {
    let (backend, executor) = create_backend();
    executor.respond_ok("docker inspect --format '{{.State.Status}}' web", "running");

    assert_eq!(
        backend.status("web").await.unwrap(),
        ContainerState::Running
    );
}

#[tokio::test]
async fn status_of_unknown_container_is_the_not_found_state() {
    let (backend, executor) = create_backend();
    executor.respond(
        "docker inspect --format '{{.State.Status}}' ghost",
        CommandOutput {
            stdout: String::new(),
            stderr: "Error: No such container: ghost".into(),
            success: false,
        },
    );

    let state = backend.status("ghost").await.unwrap();
    assert_eq!(state, ContainerState::NotFound);
    assert_eq!(state.switch_state(), SwitchState::Off);
}

#[tokio::test]
async fn close_releases_the_executor() {
    let (backend, executor) = create_backend();

    backend.close().await;
    backend.close().await;
    assert_eq!(executor.commands(), vec!["close", "close"]);
}
