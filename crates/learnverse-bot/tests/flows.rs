//! End-to-end conversation flows through the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use learnverse_bot::{AuditTrail, AuditingPlatform, BackpressureGate, Dispatcher, Replies, Services};
use learnverse_catalog::{Branch, Catalog, HttpCatalog, InMemoryCatalog};
use learnverse_classifier::{QueryClassifier, ScriptedClassifier};
use learnverse_core::{ChatId, OutgoingMessage};
use learnverse_nav::RenderContext;
use learnverse_ratelimit::{Policy, RateLimitRegistry};
use learnverse_settings::StaticFlags;
use learnverse_store::Database;
use learnverse_telegram::{RecordingPlatform, Sent, Update};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WEB: &str = "https://learnverse.live";

struct Bot {
    dispatcher: Dispatcher,
    platform: Arc<RecordingPlatform>,
    audit: Arc<AuditTrail>,
    classifier: Arc<ScriptedClassifier>,
}

fn bot(catalog: Arc<dyn Catalog>, replies: Policy) -> Bot {
    let platform = Arc::new(RecordingPlatform::new());
    let audit = Arc::new(AuditTrail::new(Database::in_memory().unwrap()));
    let classifier = Arc::new(ScriptedClassifier::positive(85));
    let gate = BackpressureGate::new(
        classifier.clone() as Arc<dyn QueryClassifier>,
        RateLimitRegistry::new("classifier", Policy::classifier()),
        RateLimitRegistry::new("replies", replies),
        Duration::from_secs(10),
        60,
    );
    let dispatcher = Dispatcher::new(Services {
        platform: Arc::new(AuditingPlatform::new(platform.clone(), audit.clone())),
        catalog,
        gate: Arc::new(gate),
        flags: Arc::new(StaticFlags::default()),
        audit: Some(audit.clone()),
        replies: Replies::new("learnverse_bot", WEB, "https://t.me/+study"),
        render: RenderContext::new(WEB),
        bot_username: "learnverse_bot".into(),
    });
    Bot {
        dispatcher,
        platform,
        audit,
        classifier,
    }
}

fn in_memory_catalog() -> Arc<dyn Catalog> {
    Arc::new(InMemoryCatalog::new().with_branch(Branch {
        id: "b1".into(),
        name: "Computer Science".into(),
        code: "CS".into(),
        years: vec![],
    }))
}

fn text(update_id: i64, chat: i64, chat_type: &str, user: i64, body: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "from": {"id": user, "first_name": "Asha", "username": format!("user{user}")},
            "chat": {"id": chat, "type": chat_type},
            "text": body,
        }
    }))
    .unwrap()
}

fn tap(update_id: i64, chat: i64, message_id: i64, data: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": update_id,
        "callback_query": {
            "id": format!("cb{update_id}"),
            "from": {"id": chat, "first_name": "Asha"},
            "message": {"message_id": message_id, "chat": {"id": chat, "type": "private"}},
            "data": data,
        }
    }))
    .unwrap()
}

fn first_token(message: &OutgoingMessage) -> String {
    message
        .buttons()
        .find_map(|b| b.token().map(str::to_string))
        .unwrap()
}

async fn mount(server: &MockServer, at: &str, data: Value) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": data})),
        )
        .mount(server)
        .await;
}

async fn mount_catalog(server: &MockServer) {
    mount(
        server,
        "/api/v1/branch",
        json!([{"_id": "b1", "name": "Computer Science", "code": "CS"}]),
    )
    .await;
    mount(
        server,
        "/api/v1/branch/b1",
        json!({"_id": "b1", "name": "Computer Science", "code": "CS",
               "years": [{"_id": "y1", "code": 2024}]}),
    )
    .await;
    mount(
        server,
        "/api/v1/year/y1",
        json!({"_id": "y1", "code": "2024", "branch": "b1",
               "syllabuses": [{"_id": "s1", "patternYear": 2019}]}),
    )
    .await;
    mount(
        server,
        "/api/v1/syllabus/s1",
        json!({"_id": "s1", "patternYear": "2019", "academicYear": "y1",
               "subjects": [{"_id": "u1", "code": "310241", "name": "Operating Systems"}]}),
    )
    .await;
    mount(
        server,
        "/api/v1/subject/u1",
        json!({
            "_id": "u1", "name": "Operating Systems", "code": "310241",
            "syllabus": {"_id": "s1", "patternYear": 2019},
            "units": [
                {"unitNumber": "2", "files": [{"_id": "f2", "fileName": "Scheduling.pdf"}]},
                {"unitNumber": 1, "files": [{"_id": "f1", "fileName": "Processes.pdf"}]},
                {"unitNumber": 3, "files": []}
            ],
            "previousYear": {
                "insem": [{"_id": "p1", "fileName": "Insem 2023.pdf"}],
                "endsem": [{"_id": "p2", "fileName": "Endsem 2023.pdf"}]
            },
            "decodes": null
        }),
    )
    .await;
}

#[tokio::test]
async fn search_walks_down_to_subject_materials() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    let catalog = Arc::new(HttpCatalog::new(
        reqwest::Client::new(),
        &server.uri(),
        Duration::from_secs(2),
    ));
    let replies = Policy {
        min_spacing: Duration::ZERO,
        ..Policy::replies()
    };
    let bot = bot(catalog, replies);

    bot.dispatcher.handle(text(1, 7, "private", 7, "/search")).await;
    let root = bot.platform.last_message().unwrap();
    assert!(root.text.contains("Search Files"));
    let message_id = match bot.platform.sent().last() {
        Some(Sent::Send { .. }) => 1000,
        other => panic!("expected a fresh message, got {other:?}"),
    };

    let mut token = first_token(&root);
    let expected = ["b:b1", "y:y1:b1", "s:s1:y1", "u:u1:s1"];
    for (i, want) in expected.iter().enumerate() {
        assert_eq!(token, *want);
        bot.dispatcher.handle(tap(10 + i as i64, 7, message_id, &token)).await;
        let screen = bot.platform.last_message().unwrap();
        if i + 1 < expected.len() {
            token = first_token(&screen);
        }
    }

    let materials = bot.platform.last_message().unwrap().text;
    assert!(materials.contains("Operating Systems"));
    assert!(materials.contains("Pattern: 2019"));
    let unit1 = materials.find("Unit 1:").unwrap();
    let unit2 = materials.find("Unit 2:").unwrap();
    let insem = materials.find("(InSem)").unwrap();
    let endsem = materials.find("(EndSem)").unwrap();
    assert!(unit1 < unit2 && unit2 < insem && insem < endsem);
    assert!(!materials.contains("Unit 3:"));
    assert!(materials.contains(r#"<a href="https://learnverse.live/viewer/f1">Processes.pdf</a>"#));

    // Every tap was acknowledged and edited the same message in place.
    let sent = bot.platform.sent();
    let acks = sent.iter().filter(|s| matches!(s, Sent::Callback { .. })).count();
    let edits = sent
        .iter()
        .filter(|s| matches!(s, Sent::Edit { message_id: m, .. } if m.0 == 1000))
        .count();
    assert_eq!(acks, 4);
    assert_eq!(edits, 4);

    // The audit trail holds the command and one upserted bot message.
    let history = bot.audit.history(ChatId(7), 10);
    assert_eq!(history.len(), 2);
    assert!(history[1].is_bot);
    assert!(history[1].content.contains("Operating Systems"));
}

#[tokio::test(start_paused = true)]
async fn sixth_group_request_from_one_user_is_dropped() {
    let bot = bot(in_memory_catalog(), Policy::replies());
    for i in 1..=6 {
        bot.dispatcher
            .handle(text(i, -100, "supergroup", 42, "anyone has OS notes?"))
            .await;
    }
    assert_eq!(bot.classifier.calls(), 5);
    assert_eq!(bot.platform.messages().len(), 5);
    assert!(bot.audit.history(ChatId(-100), 10).is_empty());
}

#[tokio::test(start_paused = true)]
async fn busy_group_loses_replies_silently() {
    let bot = bot(in_memory_catalog(), Policy::replies());
    for user in 1..=16 {
        bot.dispatcher
            .handle(text(user, -100, "supergroup", user, "need DBMS pyqs"))
            .await;
    }
    assert_eq!(bot.classifier.calls(), 16);
    let replies = bot.platform.messages();
    assert_eq!(replies.len(), 15);
    assert!(replies.iter().all(|m| m.reply_to.is_some()));
}

#[tokio::test(start_paused = true)]
async fn private_flood_gets_one_notice_per_window() {
    let bot = bot(in_memory_catalog(), Policy::replies());
    for i in 1..=20 {
        bot.dispatcher.handle(text(i, 7, "private", 7, "hello?")).await;
    }
    let notice = Replies::new("learnverse_bot", WEB, "").throttled().text;
    let count = |msgs: &[OutgoingMessage]| msgs.iter().filter(|m| m.text == notice).count();
    let msgs = bot.platform.messages();
    assert_eq!(msgs.len(), 16);
    assert_eq!(count(&msgs), 1);

    tokio::time::sleep(Duration::from_secs(61)).await;
    bot.dispatcher.handle(text(21, 7, "private", 7, "hello?")).await;
    let msgs = bot.platform.messages();
    assert_eq!(msgs.len(), 17);
    assert!(msgs.last().unwrap().text.starts_with("Meow! Luna here!"));
}
