// AlertDispatcher tests against a mock gateway

mod common;

use common::{alerts_config, dec};
use dbsize_monitor::alerts::{AlertDispatcher, DispatchSummary};
use dbsize_monitor::models::GrowthAlert;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn alert() -> GrowthAlert {
    GrowthAlert {
        server_alias: "Copernico".into(),
        label: "CO_DTH_BASE_Data".into(),
        baseline_mb: dec("1000"),
        new_mb: dec("1035.01"),
    }
}

#[tokio::test]
async fn dispatch_sends_one_get_per_recipient() {
    let gateway = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/whatsapp.php"))
        .and(query_param("apikey", "test-key"))
        .and(query_param(
            "text",
            "Alert! CO_DTH_BASE_Data on Copernico grew from 1000.00MB to 1035.01MB (>3%).",
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&gateway)
        .await;

    let url = format!("{}/whatsapp.php", gateway.uri());
    let dispatcher = AlertDispatcher::new(&alerts_config(&url, &["+5711", "+5722"])).unwrap();
    let summary = dispatcher.dispatch(&alert()).await;
    assert_eq!(summary, DispatchSummary { sent: 2, failed: 0 });
}

#[tokio::test]
async fn failed_recipient_does_not_block_the_rest() {
    let gateway = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("phone", "+5711"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&gateway)
        .await;
    Mock::given(method("GET"))
        .and(query_param("phone", "+5722"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&gateway)
        .await;

    let url = format!("{}/whatsapp.php", gateway.uri());
    let dispatcher = AlertDispatcher::new(&alerts_config(&url, &["+5711", "+5722"])).unwrap();
    let summary = dispatcher.dispatch(&alert()).await;
    assert_eq!(summary, DispatchSummary { sent: 1, failed: 1 });
}

#[tokio::test]
async fn unreachable_gateway_is_counted_not_fatal() {
    // Nothing listens on the discard port.
    let dispatcher =
        AlertDispatcher::new(&alerts_config("http://127.0.0.1:9/whatsapp.php", &["+5711"]))
            .unwrap();
    let summary = dispatcher.dispatch(&alert()).await;
    assert_eq!(summary, DispatchSummary { sent: 0, failed: 1 });
}

#[tokio::test]
async fn no_recipients_sends_nothing() {
    let gateway = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&gateway)
        .await;

    let dispatcher = AlertDispatcher::new(&alerts_config(&gateway.uri(), &[])).unwrap();
    let summary = dispatcher.dispatch(&alert()).await;
    assert_eq!(summary, DispatchSummary::default());
}

#[test]
fn message_renders_configured_threshold() {
    let mut config = alerts_config("http://127.0.0.1:9/", &[]);
    config.threshold_percent = dec("2.50");
    let dispatcher = AlertDispatcher::new(&config).unwrap();
    assert_eq!(
        dispatcher.message(&alert()),
        "Alert! CO_DTH_BASE_Data on Copernico grew from 1000.00MB to 1035.01MB (>2.5%)."
    );
}
