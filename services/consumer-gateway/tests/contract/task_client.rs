//! Contract between the gateway and the task provider.

use super::{authorized, client, json_ok, mock_config, persist};
use cdct_pact::{
    ConsumerTest, ContractRecorder, Interaction, PactError, ProviderState, RequestMatcher,
    ResponseMatcher, Template,
};
use consumer_gateway::{GatewayError, Task};
use test_utils::fixtures::{
    CONSUMER, ClientTokens, TASK_API_PATH, TASK_CONTENT_EXAMPLE, TASK_ID_EXAMPLE, TASK_PROVIDER,
    TASK_TITLE_EXAMPLE,
};

const TASK_ID_PARAM: &str = "task-id";

fn task_body(id: Template) -> cdct_pact::PactResult<Template> {
    Template::object()
        .field("id", id)
        .string_type("title", TASK_TITLE_EXAMPLE)
        .string_type("content", TASK_CONTENT_EXAMPLE)
        .build()
}

fn assert_task(task: &Task, id: &str) {
    assert_eq!(task.id, id);
    assert_eq!(task.title, TASK_TITLE_EXAMPLE);
    assert_eq!(task.content, TASK_CONTENT_EXAMPLE);
}

// The provider must hold a task with the well-known id '1'.
#[tokio::test]
async fn test_get_task_by_fixed_id() -> anyhow::Result<()> {
    let tokens = ClientTokens::task_client()?;
    let path = format!("{TASK_API_PATH}/1");
    let interaction = Interaction::builder(CONSUMER, TASK_PROVIDER)
        .given("A task with task id '1' is present")
        .upon_receiving(format!("A GET request to {path}"))
        .with_request(authorized(RequestMatcher::get(&path), &tokens.read))
        .will_respond_with(json_ok(task_body(Template::literal("1"))?))
        .build()?;

    let token = tokens.read.as_str();
    let mut recorder = ContractRecorder::new();
    let task = ConsumerTest::new(interaction)
        .with_config(mock_config())
        .start_mock()
        .await?
        .exercise(|url| async move {
            client::<Task>(&url, TASK_API_PATH, token)?
                .fetch_by_id("1")
                .await
        })
        .await?
        .assert_body_matches()?
        .record(&mut recorder);

    assert_task(&task, "1");
    persist(&recorder)
}

// Task ids come from a sequence, so the provider supplies the id while
// setting up the state. Locally the example id stands in for it.
#[tokio::test]
async fn test_get_task_with_provider_supplied_id() -> anyhow::Result<()> {
    let tokens = ClientTokens::task_client()?;
    let expression = format!("${{{TASK_ID_PARAM}}}");
    let path = format!("{TASK_API_PATH}/{expression}");
    let interaction = Interaction::builder(CONSUMER, TASK_PROVIDER)
        .given(ProviderState::new("A task is present").with_provider_param(TASK_ID_PARAM))
        .upon_receiving(format!("A request to {path}"))
        .with_request(authorized(
            RequestMatcher::from_provider_state(
                "GET",
                &path,
                format!("{TASK_API_PATH}/{TASK_ID_EXAMPLE}"),
            )?,
            &tokens.read,
        ))
        .will_respond_with(json_ok(task_body(Template::from_provider_state(
            &expression,
            TASK_ID_EXAMPLE,
        )?)?))
        .build()?;

    let token = tokens.read.as_str();
    let mut recorder = ContractRecorder::new();
    let task = ConsumerTest::new(interaction)
        .with_config(mock_config())
        .start_mock()
        .await?
        .exercise(|url| async move {
            client::<Task>(&url, TASK_API_PATH, token)?
                .fetch_by_id(TASK_ID_EXAMPLE)
                .await
        })
        .await?
        .assert_body_matches()?
        .record(&mut recorder);

    assert_task(&task, TASK_ID_EXAMPLE);
    persist(&recorder)
}

// The consumer binds the id in the state parameters; the provider receives
// them when setting up the state.
#[tokio::test]
async fn test_get_task_with_consumer_bound_id() -> anyhow::Result<()> {
    let tokens = ClientTokens::task_client()?;
    let expression = format!("${{{TASK_ID_PARAM}}}");
    let interaction = Interaction::builder(CONSUMER, TASK_PROVIDER)
        .given(
            ProviderState::new(format!("A task with task id {expression} is present"))
                .with_param(TASK_ID_PARAM, TASK_ID_EXAMPLE),
        )
        .upon_receiving(format!("A GET request to {TASK_API_PATH}/{expression}"))
        .with_request(authorized(
            RequestMatcher::get(format!("{TASK_API_PATH}/{TASK_ID_EXAMPLE}")),
            &tokens.read,
        ))
        .will_respond_with(json_ok(task_body(Template::literal(TASK_ID_EXAMPLE))?))
        .build()?;

    let token = tokens.read.as_str();
    let mut recorder = ContractRecorder::new();
    let task = ConsumerTest::new(interaction)
        .with_config(mock_config())
        .start_mock()
        .await?
        .exercise(|url| async move {
            client::<Task>(&url, TASK_API_PATH, token)?
                .fetch_by_id(TASK_ID_EXAMPLE)
                .await
        })
        .await?
        .assert_body_matches()?
        .record(&mut recorder);

    assert_task(&task, TASK_ID_EXAMPLE);
    persist(&recorder)
}

#[tokio::test]
async fn test_get_task_with_insufficient_authorization() -> anyhow::Result<()> {
    let tokens = ClientTokens::task_client()?;
    let path = format!("{TASK_API_PATH}/1");
    let interaction = Interaction::builder(CONSUMER, TASK_PROVIDER)
        .given("A task with task id '1' is present")
        .upon_receiving(format!("A request to {path} with insufficient authorization"))
        .with_request(authorized(RequestMatcher::get(&path), &tokens.unrelated_role))
        .will_respond_with(ResponseMatcher::status(403))
        .build()?;

    let token = tokens.unrelated_role.as_str();
    let mut recorder = ContractRecorder::new();
    let result = ConsumerTest::new(interaction)
        .with_config(mock_config())
        .start_mock()
        .await?
        .exercise(|url| async move {
            client::<Task>(&url, TASK_API_PATH, token)?
                .fetch_by_id("1")
                .await
        })
        .await?
        .assert_that("insufficient authentication is reported", |result| {
            matches!(
                result,
                Err(GatewayError::InsufficientAuthentication { resource: "task" })
            )
        })?
        .record(&mut recorder);

    assert!(result.is_err());
    persist(&recorder)
}

#[tokio::test]
async fn test_get_all_tasks() -> anyhow::Result<()> {
    let tokens = ClientTokens::task_client()?;
    let interaction = Interaction::builder(CONSUMER, TASK_PROVIDER)
        .given("Several tasks are present")
        .upon_receiving(format!("A request to {TASK_API_PATH}"))
        .with_request(authorized(RequestMatcher::get(TASK_API_PATH), &tokens.read))
        .will_respond_with(json_ok(Template::array_min_like(
            2,
            task_body(Template::string_type(TASK_ID_EXAMPLE))?,
        )))
        .build()?;

    let token = tokens.read.as_str();
    let mut recorder = ContractRecorder::new();
    let tasks = ConsumerTest::new(interaction)
        .with_config(mock_config())
        .start_mock()
        .await?
        .exercise(|url| async move {
            client::<Task>(&url, TASK_API_PATH, token)?
                .fetch_all()
                .await
        })
        .await?
        .assert_body_matches()?
        .record(&mut recorder);

    assert_eq!(tasks.len(), 2);
    for task in &tasks {
        assert_task(task, TASK_ID_EXAMPLE);
    }
    persist(&recorder)
}

// A request the contract does not declare fails the exchange and leaves
// nothing to record.
#[tokio::test]
async fn test_undeclared_request_is_not_recorded() -> anyhow::Result<()> {
    let tokens = ClientTokens::task_client()?;
    let path = format!("{TASK_API_PATH}/1");
    let interaction = Interaction::builder(CONSUMER, TASK_PROVIDER)
        .given("A task with task id '1' is present")
        .upon_receiving(format!("A GET request to {path}"))
        .with_request(authorized(RequestMatcher::get(&path), &tokens.read))
        .will_respond_with(json_ok(task_body(Template::literal("1"))?))
        .build()?;

    let token = tokens.read.as_str();
    let recorder = ContractRecorder::new();
    let result = ConsumerTest::new(interaction)
        .with_config(mock_config())
        .start_mock()
        .await?
        .exercise(|url| async move {
            client::<Task>(&url, TASK_API_PATH, token)?
                .fetch_by_id("2")
                .await
        })
        .await;

    match result {
        Err(PactError::RequestMismatch { requests }) => {
            assert_eq!(requests.len(), 1);
            assert!(requests[0].to_string().contains("/2"));
        }
        other => panic!("expected a request mismatch, got {other:?}"),
    }
    assert!(recorder.is_empty());
    Ok(())
}
