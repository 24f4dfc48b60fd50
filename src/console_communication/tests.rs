use super::{ConsoleError, ConsoleMessenger, Downstream, RequestId, Upstream};
use crate::flight_control::{FlightController, SimVehicle, common::Vec3D};
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::{RwLock, mpsc::UnboundedReceiver},
    task::JoinHandle,
};

const TICK: Duration = Duration::from_millis(50);

fn messenger() -> (ConsoleMessenger, UnboundedReceiver<Downstream>, JoinHandle<()>) {
    let mut f_cont = FlightController::new();
    f_cont.attach(Box::new(SimVehicle::new(Vec3D::zero())));
    let f_cont = Arc::new(RwLock::new(f_cont));
    let ticker = {
        let f_cont = Arc::clone(&f_cont);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK);
            loop {
                interval.tick().await;
                let mut f_cont = f_cont.write().await;
                f_cont.update(TICK.as_secs_f64());
                f_cont.integrate(TICK.as_secs_f64());
            }
        })
    };
    let (messenger, rx) = ConsoleMessenger::new(f_cont, Duration::from_secs(300));
    (messenger, rx, ticker)
}

fn command(id: u64, action: &str, args: Value) -> Upstream {
    Upstream::Command { request_id: Some(RequestId::Num(id)), action: action.into(), args }
}

async fn next(rx: &mut UnboundedReceiver<Downstream>) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(120), rx.recv())
        .await
        .expect("no downstream message in time")
        .expect("downstream closed");
    serde_json::to_value(msg).unwrap()
}

/// Reads messages until the response to `id` arrives, returning everything read.
async fn until_response(rx: &mut UnboundedReceiver<Downstream>, id: u64) -> Vec<Value> {
    let mut seen = Vec::new();
    loop {
        let msg = next(rx).await;
        let done = msg["type"] == "response" && msg["requestId"] == json!(id);
        seen.push(msg);
        if done {
            return seen;
        }
    }
}

#[test]
fn test_decode_frames() {
    assert_eq!(
        Upstream::decode(br#"{"type":"ping","requestId":7}"#).unwrap(),
        Upstream::Ping { request_id: Some(RequestId::Num(7)) }
    );
    assert_eq!(
        Upstream::decode(br#"{"type":"command","requestId":"a","action":"hover"}"#).unwrap(),
        Upstream::Command {
            request_id: Some(RequestId::Text("a".into())),
            action: "hover".into(),
            args: Value::Null,
        }
    );
    assert_eq!(
        Upstream::decode(br#"{"type":"init","client":"unity","version":"1.2"}"#).unwrap(),
        Upstream::Init { client: Some("unity".into()), version: Some("1.2".into()) }
    );

    let Err((id, err)) = Upstream::decode(br#"{"type":"telemetry","requestId":"t"}"#) else {
        panic!("unknown type decoded");
    };
    assert_eq!(id, Some(RequestId::Text("t".into())));
    assert!(matches!(err, ConsoleError::UnknownMessage(ref kind) if kind == "telemetry"));

    let Err((id, err)) = Upstream::decode(br#"{"type":"query","requestId":3}"#) else {
        panic!("query without action decoded");
    };
    assert_eq!(id, Some(RequestId::Num(3)));
    assert!(matches!(err, ConsoleError::InvalidArguments(_)));

    let Err((id, err)) = Upstream::decode(b"{not json") else { panic!("garbage decoded") };
    assert_eq!(id, None);
    assert!(matches!(err, ConsoleError::InvalidArguments(_)));
}

#[tokio::test(start_paused = true)]
async fn test_ping_and_init() {
    let (messenger, mut rx, ticker) = messenger();
    messenger.handle(Upstream::Init { client: None, version: None }).await;
    messenger.handle(Upstream::Ping { request_id: None }).await;
    messenger.handle(Upstream::Ping { request_id: Some(RequestId::Text("p1".into())) }).await;
    assert_eq!(next(&mut rx).await, json!({"type": "pong", "requestId": "p1"}));
    assert!(rx.try_recv().is_err());
    ticker.abort();
}

#[tokio::test(start_paused = true)]
async fn test_queries() {
    let (messenger, mut rx, ticker) = messenger();
    let query = |id: u64, action: &str| Upstream::Query {
        request_id: Some(RequestId::Num(id)),
        action: action.into(),
    };

    messenger.handle(query(1, "get_state")).await;
    let state = next(&mut rx).await;
    assert_eq!(state["ok"], json!(true));
    assert_eq!(state["result"]["controllerState"], json!("idle"));
    assert_eq!(state["result"]["queueLength"], json!(0));
    assert_eq!(state["result"]["isActive"], json!(false));
    assert_eq!(state["result"]["position"], json!({"x": 0.0, "y": 0.0, "z": 0.0}));

    messenger.handle(query(2, "is_active")).await;
    assert_eq!(next(&mut rx).await["result"], json!(false));

    messenger.handle(query(3, "get_battery")).await;
    let unknown = next(&mut rx).await;
    assert_eq!(unknown["ok"], json!(false));
    assert_eq!(unknown["error"], json!("unknown action \"get_battery\""));
    ticker.abort();
}

#[tokio::test(start_paused = true)]
async fn test_command_rejections() {
    let (messenger, mut rx, ticker) = messenger();

    messenger.handle(command(1, "barrel_roll", Value::Null)).await;
    assert_eq!(next(&mut rx).await["error"], json!("unknown action \"barrel_roll\""));

    messenger.handle(command(2, "take_off", json!({"options": {}}))).await;
    let invalid = next(&mut rx).await;
    assert_eq!(invalid["ok"], json!(false));
    assert!(invalid["error"].as_str().unwrap().starts_with("invalid arguments"));

    messenger.handle(command(3, "pause", Value::Null)).await;
    assert_eq!(next(&mut rx).await["error"], json!("cannot pause while controller is Idle"));

    messenger
        .handle(command(4, "run_mission", json!({"waypoints": [{"type": "loop"}]})))
        .await;
    let bad_mission = next(&mut rx).await;
    assert!(bad_mission["error"].as_str().unwrap().contains("unknown waypoint type"));
    ticker.abort();
}

#[tokio::test(start_paused = true)]
async fn test_take_off_responds_on_settle() {
    let (messenger, mut rx, ticker) = messenger();
    let args = json!({"altitude": 1.0, "options": {"altitudeTolerance": 0.05}});
    messenger.handle(command(1, "take_off", args)).await;
    assert!(rx.try_recv().is_err());

    let response = next(&mut rx).await;
    assert_eq!(response["requestId"], json!(1));
    assert_eq!(response["ok"], json!(true));
    assert_eq!(response["result"]["target"], json!(1.0));
    let altitude = response["result"]["altitude"].as_f64().unwrap();
    assert!((altitude - 1.0).abs() <= 0.05 + 1e-9);
    ticker.abort();
}

#[tokio::test(start_paused = true)]
async fn test_hover_preempts_queued_commands() {
    let (messenger, mut rx, ticker) = messenger();
    messenger.handle(command(1, "take_off", json!({"altitude": 5.0}))).await;
    messenger.handle(command(2, "move_to", json!({"x": 1.0, "z": 1.0}))).await;
    messenger.handle(command(3, "hover", Value::Null)).await;

    let mut responses = Vec::new();
    for _ in 0..3 {
        responses.push(next(&mut rx).await);
    }
    let by_id = |id: u64| {
        responses.iter().find(|r| r["requestId"] == json!(id)).cloned().unwrap_or_default()
    };
    assert_eq!(by_id(1)["error"], json!("command cancelled"));
    assert_eq!(by_id(2)["error"], json!("command cancelled"));
    assert_eq!(by_id(3)["ok"], json!(true));
    assert!(by_id(3)["result"]["altitude"].is_number());
    ticker.abort();
}

#[tokio::test(start_paused = true)]
async fn test_move_relative_and_rotate() {
    let (messenger, mut rx, ticker) = messenger();
    messenger.handle(command(1, "rotate_yaw", json!({"angle": 0.5}))).await;
    assert_eq!(next(&mut rx).await["result"], json!({"angle": 0.5}));

    let args = json!({"frame": "world", "forward": 0.3, "right": 0.0, "up": 0.0});
    messenger.handle(command(2, "move_relative", args)).await;
    let moved = next(&mut rx).await;
    assert_eq!(moved["ok"], json!(true));
    let target = &moved["result"]["target"];
    assert!(target["x"].as_f64().unwrap().abs() < 1e-9);
    assert!((target["z"].as_f64().unwrap() + 0.3).abs() < 1e-9);

    messenger.handle(command(3, "move_relative", json!({"frame": "sideways"}))).await;
    assert_eq!(next(&mut rx).await["ok"], json!(false));
    ticker.abort();
}

#[tokio::test(start_paused = true)]
async fn test_run_mission_streams_progress() {
    let (messenger, mut rx, ticker) = messenger();
    let waypoints = json!([
        {"type": "takeOff", "altitude": 0.5},
        {"type": "hover", "durationMs": 200},
    ]);
    messenger.handle(command(1, "run_mission", json!({"waypoints": waypoints}))).await;
    messenger.handle(command(2, "run_mission", json!({"waypoints": []}))).await;

    let seen = until_response(&mut rx, 1).await;
    let busy = seen.iter().find(|m| m["requestId"] == json!(2)).cloned().unwrap_or_default();
    assert_eq!(busy["error"], json!("another mission is still running"));

    let progress: Vec<&Value> = seen.iter().filter(|m| m["type"] == "progress").collect();
    assert_eq!(progress.len(), 2);
    assert_eq!(progress[0]["action"], json!("mission"));
    assert_eq!(progress[0]["current"], json!(0));
    assert_eq!(progress[1]["current"], json!(1));
    assert_eq!(progress[1]["total"], json!(2));
    assert_eq!(progress[1]["waypoint"]["type"], json!("hover"));

    let done = seen.last().cloned().unwrap_or_default();
    assert_eq!(done["ok"], json!(true));
    assert_eq!(done["result"]["waypointsCompleted"], json!(2));
    assert_eq!(done["result"]["waypointsTotal"], json!(2));

    // The slot frees up once the mission is over.
    messenger.handle(command(3, "run_mission", json!({"waypoints": []}))).await;
    let empty = until_response(&mut rx, 3).await;
    assert_eq!(empty.last().cloned().unwrap_or_default()["ok"], json!(true));
    ticker.abort();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_and_pause_target_the_mission() {
    let (messenger, mut rx, ticker) = messenger();
    let waypoints = json!([{"type": "takeOff", "altitude": 5.0}, {"type": "land"}]);
    messenger.handle(command(1, "run_mission", json!({"waypoints": waypoints}))).await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    messenger.handle(command(2, "pause", Value::Null)).await;
    let paused = until_response(&mut rx, 2).await;
    assert_eq!(paused.last().cloned().unwrap_or_default()["result"]["controllerState"], "paused");
    messenger.handle(command(3, "resume", Value::Null)).await;
    let resumed = until_response(&mut rx, 3).await;
    assert_eq!(resumed.last().cloned().unwrap_or_default()["result"]["controllerState"], "running");

    messenger.handle(command(4, "cancel", Value::Null)).await;
    let cancelled = until_response(&mut rx, 4).await;
    assert_eq!(
        cancelled.last().cloned().unwrap_or_default()["result"],
        json!({"cancelledCommands": 1, "missionCancelled": true})
    );
    let mission = until_response(&mut rx, 1).await;
    assert_eq!(mission.last().cloned().unwrap_or_default()["error"], json!("mission cancelled"));
    ticker.abort();
}

async fn start_console() -> (Arc<ConsoleMessenger>, std::net::SocketAddr) {
    let f_cont = Arc::new(RwLock::new(FlightController::new()));
    let messenger =
        ConsoleMessenger::start("127.0.0.1:0".parse().unwrap(), f_cont, Duration::from_secs(300))
            .await
            .unwrap();
    let addr = messenger.local_addr().unwrap();
    (messenger, addr)
}

fn frame(payload: &[u8]) -> Vec<u8> {
    let mut buf = u32::try_from(payload.len()).unwrap().to_be_bytes().to_vec();
    buf.extend_from_slice(payload);
    buf
}

async fn write_frame(stream: &mut TcpStream, payload: &[u8]) {
    stream.write_all(&frame(payload)).await.unwrap();
}

async fn read_frame(stream: &mut TcpStream) -> Value {
    let read = async {
        let len = stream.read_u32().await.unwrap();
        let mut buf = vec![0u8; len as usize];
        stream.read_exact(&mut buf).await.unwrap();
        serde_json::from_slice::<Value>(&buf).unwrap()
    };
    tokio::time::timeout(Duration::from_secs(10), read).await.expect("no frame in time")
}

/// Reads frames until the one answering `id`.
async fn read_reply(stream: &mut TcpStream, id: &Value) -> Value {
    loop {
        let msg = read_frame(stream).await;
        if &msg["requestId"] == id {
            return msg;
        }
    }
}

#[tokio::test]
async fn test_tcp_session() {
    let (_messenger, addr) = start_console().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    write_frame(&mut stream, br#"{"type":"init","client":"test","version":"0"}"#).await;
    write_frame(&mut stream, br#"{"type":"ping"}"#).await;
    write_frame(&mut stream, br#"{"type":"ping","requestId":"tcp"}"#).await;
    assert_eq!(read_frame(&mut stream).await, json!({"type": "pong", "requestId": "tcp"}));

    write_frame(&mut stream, br#"{"type":"status","requestId":9}"#).await;
    let rejected = read_frame(&mut stream).await;
    assert_eq!(rejected["requestId"], json!(9));
    assert_eq!(rejected["ok"], json!(false));
    assert_eq!(rejected["error"], json!("unknown message type \"status\""));

    write_frame(&mut stream, br#"{"type":"query","requestId":10,"action":"get_state"}"#).await;
    let state = read_frame(&mut stream).await;
    assert_eq!(state["result"]["controllerState"], json!("idle"));
}

#[tokio::test]
async fn test_burst_of_requests_is_answered() {
    const BURST: u64 = 500;
    let (_messenger, addr) = start_console().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let mut burst = Vec::new();
    for id in 0..BURST {
        let query = json!({"type": "query", "requestId": id, "action": "get_state"});
        burst.extend(frame(&serde_json::to_vec(&query).unwrap()));
    }
    stream.write_all(&burst).await.unwrap();

    for id in 0..BURST {
        let response = read_frame(&mut stream).await;
        assert_eq!(response["requestId"], json!(id));
        assert_eq!(response["ok"], json!(true));
    }
}

#[tokio::test]
async fn test_sessions_share_replies() {
    let (_messenger, addr) = start_console().await;
    let mut first = TcpStream::connect(addr).await.unwrap();
    write_frame(&mut first, br#"{"type":"ping","requestId":"a"}"#).await;
    read_reply(&mut first, &json!("a")).await;

    let mut second = TcpStream::connect(addr).await.unwrap();
    write_frame(&mut second, br#"{"type":"ping","requestId":"b"}"#).await;
    read_reply(&mut second, &json!("b")).await;

    write_frame(&mut first, br#"{"type":"ping","requestId":"shared"}"#).await;
    read_reply(&mut first, &json!("shared")).await;
    assert_eq!(read_frame(&mut second).await["requestId"], json!("shared"));

    drop(first);
    let mut third = TcpStream::connect(addr).await.unwrap();
    write_frame(&mut third, br#"{"type":"ping","requestId":"c"}"#).await;
    assert_eq!(read_reply(&mut third, &json!("c")).await["type"], json!("pong"));
    assert_eq!(read_frame(&mut second).await["requestId"], json!("c"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_reaches_mission_before_its_waypoint_fails() {
    for round in 0..10 {
        let (messenger, mut rx, ticker) = messenger();
        let waypoints = json!([{"type": "takeOff", "altitude": 5.0}, {"type": "land"}]);
        messenger.handle(command(1, "run_mission", json!({"waypoints": waypoints}))).await;
        tokio::time::sleep(Duration::from_millis(120)).await;

        messenger.handle(command(2, "cancel", Value::Null)).await;
        let cancelled = until_response(&mut rx, 2).await.pop().unwrap_or_default();
        assert_eq!(
            cancelled["result"],
            json!({"cancelledCommands": 1, "missionCancelled": true}),
            "round {round}"
        );
        let mission = until_response(&mut rx, 1).await.pop().unwrap_or_default();
        assert_eq!(mission["error"], json!("mission cancelled"), "round {round}");
        ticker.abort();
    }
}
