//! Contract between the gateway and the user provider.

use super::{authorized, client, json_ok, mock_config, persist};
use cdct_pact::{
    ConsumerTest, ContractRecorder, Interaction, PactResult, ProviderState, RequestMatcher,
    ResponseMatcher, Template,
};
use consumer_gateway::{GatewayError, User};
use test_utils::fixtures::{
    CONSUMER, ClientTokens, USER_API_PATH, USER_ID_EXAMPLE, USER_NAME_EXAMPLE, USER_PROVIDER,
};

const USER_ID_PARAM: &str = "user-id";

fn user_body(id: Template) -> PactResult<Template> {
    Template::object()
        .field("id", id)
        .string_type("name", USER_NAME_EXAMPLE)
        .build()
}

fn expected_user(id: &str) -> User {
    User {
        id: id.to_string(),
        name: USER_NAME_EXAMPLE.to_string(),
    }
}

#[tokio::test]
async fn test_get_user_by_fixed_id() -> anyhow::Result<()> {
    let tokens = ClientTokens::user_client()?;
    let path = format!("{USER_API_PATH}/1");
    let interaction = Interaction::builder(CONSUMER, USER_PROVIDER)
        .given("A user with user id '1' is present")
        .upon_receiving(format!("A GET request to {path}"))
        .with_request(authorized(RequestMatcher::get(&path), &tokens.read))
        .will_respond_with(json_ok(user_body(Template::literal("1"))?))
        .build()?;

    let token = tokens.read.as_str();
    let mut recorder = ContractRecorder::new();
    let user = ConsumerTest::new(interaction)
        .with_config(mock_config())
        .start_mock()
        .await?
        .exercise(|url| async move {
            client::<User>(&url, USER_API_PATH, token)?
                .fetch_by_id("1")
                .await
        })
        .await?
        .assert_body_matches()?
        .record(&mut recorder);

    assert_eq!(user, expected_user("1"));
    persist(&recorder)
}

#[tokio::test]
async fn test_get_user_with_provider_supplied_id() -> anyhow::Result<()> {
    let tokens = ClientTokens::user_client()?;
    let expression = format!("${{{USER_ID_PARAM}}}");
    let path = format!("{USER_API_PATH}/{expression}");
    let interaction = Interaction::builder(CONSUMER, USER_PROVIDER)
        .given(ProviderState::new("A user is present").with_provider_param(USER_ID_PARAM))
        .upon_receiving(format!("A request to {path}"))
        .with_request(authorized(
            RequestMatcher::from_provider_state(
                "GET",
                &path,
                format!("{USER_API_PATH}/{USER_ID_EXAMPLE}"),
            )?,
            &tokens.read,
        ))
        .will_respond_with(json_ok(user_body(Template::from_provider_state(
            &expression,
            USER_ID_EXAMPLE,
        )?)?))
        .build()?;

    let token = tokens.read.as_str();
    let mut recorder = ContractRecorder::new();
    let user = ConsumerTest::new(interaction)
        .with_config(mock_config())
        .start_mock()
        .await?
        .exercise(|url| async move {
            client::<User>(&url, USER_API_PATH, token)?
                .fetch_by_id(USER_ID_EXAMPLE)
                .await
        })
        .await?
        .assert_body_matches()?
        .record(&mut recorder);

    assert_eq!(user, expected_user(USER_ID_EXAMPLE));
    persist(&recorder)
}

#[tokio::test]
async fn test_get_user_with_consumer_bound_id() -> anyhow::Result<()> {
    let tokens = ClientTokens::user_client()?;
    let expression = format!("${{{USER_ID_PARAM}}}");
    let interaction = Interaction::builder(CONSUMER, USER_PROVIDER)
        .given(
            ProviderState::new(format!("A user with user id {expression} is present"))
                .with_param(USER_ID_PARAM, USER_ID_EXAMPLE),
        )
        .upon_receiving(format!("A GET request to {USER_API_PATH}/{expression}"))
        .with_request(authorized(
            RequestMatcher::get(format!("{USER_API_PATH}/{USER_ID_EXAMPLE}")),
            &tokens.read,
        ))
        .will_respond_with(json_ok(user_body(Template::literal(USER_ID_EXAMPLE))?))
        .build()?;

    let token = tokens.read.as_str();
    let mut recorder = ContractRecorder::new();
    let user = ConsumerTest::new(interaction)
        .with_config(mock_config())
        .start_mock()
        .await?
        .exercise(|url| async move {
            client::<User>(&url, USER_API_PATH, token)?
                .fetch_by_id(USER_ID_EXAMPLE)
                .await
        })
        .await?
        .assert_body_matches()?
        .record(&mut recorder);

    assert_eq!(user, expected_user(USER_ID_EXAMPLE));
    persist(&recorder)
}

#[tokio::test]
async fn test_get_user_with_insufficient_authorization() -> anyhow::Result<()> {
    let tokens = ClientTokens::user_client()?;
    let path = format!("{USER_API_PATH}/1");
    let interaction = Interaction::builder(CONSUMER, USER_PROVIDER)
        .given("A user with user id '1' is present")
        .upon_receiving(format!("A request to {path} with insufficient authorization"))
        .with_request(authorized(RequestMatcher::get(&path), &tokens.unrelated_role))
        .will_respond_with(ResponseMatcher::status(403))
        .build()?;

    let token = tokens.unrelated_role.as_str();
    let mut recorder = ContractRecorder::new();
    ConsumerTest::new(interaction)
        .with_config(mock_config())
        .start_mock()
        .await?
        .exercise(|url| async move {
            client::<User>(&url, USER_API_PATH, token)?
                .fetch_by_id("1")
                .await
        })
        .await?
        .assert_that("insufficient authentication is reported", |result| {
            result
                .as_ref()
                .is_err_and(GatewayError::is_insufficient_authentication)
        })?
        .record(&mut recorder);

    assert_eq!(recorder.len(), 1);
    persist(&recorder)
}

#[tokio::test]
async fn test_get_all_users() -> anyhow::Result<()> {
    let tokens = ClientTokens::user_client()?;
    let interaction = Interaction::builder(CONSUMER, USER_PROVIDER)
        .given("Several users are present")
        .upon_receiving(format!("A request to {USER_API_PATH}"))
        .with_request(authorized(RequestMatcher::get(USER_API_PATH), &tokens.read))
        .will_respond_with(json_ok(Template::array_min_like(
            2,
            user_body(Template::string_type(USER_ID_EXAMPLE))?,
        )))
        .build()?;

    let token = tokens.read.as_str();
    let mut recorder = ContractRecorder::new();
    let users = ConsumerTest::new(interaction)
        .with_config(mock_config())
        .start_mock()
        .await?
        .exercise(|url| async move {
            client::<User>(&url, USER_API_PATH, token)?
                .fetch_all()
                .await
        })
        .await?
        .assert_body_matches()?
        .record(&mut recorder);

    assert_eq!(users, vec![expected_user(USER_ID_EXAMPLE); 2]);
    persist(&recorder)
}
