use mockito::{Matcher, Server};
use rsitrader::api::{BinanceClient, Credentials};
use rsitrader::*;
use uuid::Uuid;

const KLINES: &str = r#"[
    [1499040000000,"0.01634790","0.80000000","0.01575800","0.01577100","148976.11427815",1499644799999,"2434.19055334",308,"1756.87402397","28.46694368","0"],
    [1499644800000,"0.01577100","0.01600000","0.01500000","0.01590000","1200.50000000",1500249599999,"19.08795000",42,"600.25000000","9.54397500","0"]
]"#;

fn credentials() -> Credentials {
    Credentials {
        api_key: "test-key".to_string(),
        api_secret: "test-secret".to_string(),
    }
}

#[tokio::test]
async fn test_klines_parsed_in_order() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v3/klines")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()),
            Matcher::UrlEncoded("interval".into(), "15m".into()),
            Matcher::UrlEncoded("limit".into(), "2".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(KLINES)
        .create_async()
        .await;

    let client = BinanceClient::new(server.url()).unwrap();
    let candles = client.get_klines("BTCUSDT", "15m", 2).await.unwrap();

    mock.assert_async().await;
    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].open_time.timestamp_millis(), 1499040000000);
    assert_eq!(candles[0].close, 0.01577100);
    assert_eq!(candles[0].number_of_trades, 308);
    assert_eq!(candles[1].close, 0.01590000);
    assert_eq!(closing_prices(&candles), vec![0.015771, 0.0159]);
}

#[tokio::test]
async fn test_klines_http_error_is_transport_failure() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/v3/klines")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"code":-1121,"msg":"Invalid symbol."}"#)
        .create_async()
        .await;

    let client = BinanceClient::new(server.url()).unwrap();
    let err = client.get_klines("NOPE", "15m", 100).await.unwrap_err();

    assert!(matches!(err, BotError::Transport(_)));
    assert!(err.to_string().contains("Invalid symbol"));
}

#[tokio::test]
async fn test_market_order_is_signed() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v3/order")
        .match_header("x-mbx-apikey", "test-key")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("symbol=BTCUSDT".to_string()),
            Matcher::Regex("side=BUY".to_string()),
            Matcher::Regex("type=MARKET".to_string()),
            Matcher::Regex("quantity=0.001".to_string()),
            Matcher::Regex("timestamp=[0-9]+".to_string()),
            Matcher::Regex("&signature=[0-9a-f]{64}$".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"symbol":"BTCUSDT","orderId":28,"status":"FILLED","executedQty":"0.00100000"}"#)
        .create_async()
        .await;

    let client = BinanceClient::new(server.url())
        .unwrap()
        .with_credentials(credentials());
    let client_order_id = Uuid::new_v4();
    let ack = client
        .new_market_order("BTCUSDT", OrderSide::Buy, 0.001, client_order_id)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(ack.client_order_id, client_order_id);
    assert_eq!(ack.order_id, Some(28));
    assert_eq!(ack.status.as_deref(), Some("FILLED"));
    assert_eq!(ack.executed_qty, Some(0.001));
}

#[tokio::test]
async fn test_unexpected_fill_body_still_succeeds() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/v3/order")
        .with_status(200)
        .with_body("ok")
        .create_async()
        .await;

    let client = BinanceClient::new(server.url())
        .unwrap()
        .with_credentials(credentials());
    let ack = client
        .new_market_order("BTCUSDT", OrderSide::Sell, 0.5, Uuid::new_v4())
        .await
        .unwrap();

    assert_eq!(ack.order_id, None);
    assert_eq!(ack.executed_qty, None);
}

#[tokio::test]
async fn test_rejected_order_is_execution_failure() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/v3/order")
        .with_status(400)
        .with_body(r#"{"code":-2010,"msg":"Account has insufficient balance for requested action."}"#)
        .create_async()
        .await;

    let client = BinanceClient::new(server.url())
        .unwrap()
        .with_credentials(credentials());
    let err = client
        .new_market_order("BTCUSDT", OrderSide::Sell, 0.001, Uuid::new_v4())
        .await
        .unwrap_err();

    match err {
        BotError::Execution { status, detail } => {
            assert_eq!(status, 400);
            assert!(detail.contains("insufficient balance"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
