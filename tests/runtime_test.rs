mod common;

use common::{fast_timings, gate_context, sim_modem, small_sim, wait_for, ADMIN};
use gsm_gatekeeper::adapters::NoopPower;
use gsm_gatekeeper::domain::model::{AddOutcome, DeleteOutcome, IndexRange};
use gsm_gatekeeper::{AuthorizationStore, GateError, Modem, SlotStrategy};
use std::sync::Arc;
use tokio_test::assert_ok;

#[tokio::test]
async fn test_listener_and_dispatcher_handle_call_then_sms() {
    let sim = small_sim();
    sim.insert_contact(1, "48503815525", "");
    let (ctx, gate) = gate_context(&sim);
    let tasks = ctx.spawn();

    sim.ring(Some("+48503815525"));
    assert!(wait_for(|| gate.opened().len() == 1).await);

    let index = sim.deliver_sms(ADMIN, "+48222333444");
    assert_eq!(index, 1);
    assert!(wait_for(|| !sim.sent_messages().is_empty()).await);

    ctx.shutdown();
    tasks.join().await;

    assert_eq!(gate.opened(), vec!["+48503815525".to_string()]);
    assert_eq!(sim.count_command("ATH"), 1);
    assert_eq!(
        sim.sent_messages()[0].body,
        "Number 48222333444 added to SIM card."
    );
    assert!(ctx.queue().is_closed());
    assert!(ctx.queue().is_empty());
}

#[tokio::test]
async fn test_dispatcher_continues_after_failed_notification() {
    let sim = small_sim();
    sim.insert_contact(2, "48503815525", "");
    sim.store_sms(9, ADMIN, "+48222333444");
    // AT+CMGF=1 與 AT+CMGR=9 都沒有回應, 讀簡訊失敗
    sim.mute_next(2);
    let (ctx, gate) = gate_context(&sim);

    ctx.queue().push("\r\n+CMTI: \"SM\",9\r\n".to_string());
    ctx.queue()
        .push("\r\nRING\r\n\r\n+CLIP: \"+48503815525\",145,\"\",0,\"\",0\r\n".to_string());
    let tasks = ctx.spawn();

    assert!(wait_for(|| gate.opened().len() == 1).await);
    ctx.shutdown();
    tasks.join().await;

    assert_eq!(gate.opened(), vec!["+48503815525".to_string()]);
    assert_eq!(sim.count_command("AT+CMGR=9"), 1);
    assert_eq!(sim.count_command("AT+CMGD=9"), 0);
    assert!(sim.sent_messages().is_empty());
    assert_eq!(sim.mailbox().len(), 1);
}

#[tokio::test]
async fn test_shutdown_stops_idle_tasks() {
    let sim = small_sim();
    let (ctx, _gate) = gate_context(&sim);
    let tasks = ctx.spawn();

    ctx.shutdown();
    let joined = tokio::time::timeout(std::time::Duration::from_secs(2), tasks.join()).await;

    assert!(joined.is_ok());
    assert!(ctx.is_shutting_down());
}

#[tokio::test]
async fn test_init_device_against_simulator() {
    let sim = small_sim();
    let modem = Modem::new("sim", sim.clone(), fast_timings());

    assert_ok!(modem.init_device(&NoopPower, "internet").await);

    let commands = sim.commands();
    let position = |c: &str| commands.iter().position(|x| x == c);
    assert!(position("AT+CFUN=1,1") < position("AT+CPIN?"));
    assert!(position("AT+CREG?") < position("AT+CSTT=\"internet\",\"\",\"\""));
    assert!(position("AT+CIFSR") < position("AT+CLIP=1"));
    assert!(position("AT+CLIP=1") < position("AT+CMGF=1"));
}

#[tokio::test]
async fn test_bring_up_stops_when_not_registered() {
    let sim = small_sim();
    sim.override_reply("AT+CREG?", "\r\n+CREG: 0,2\r\n\r\nOK\r\n");
    let modem = Modem::new("sim", sim.clone(), fast_timings());

    let err = modem.bring_up_gsm("internet").await.unwrap_err();

    assert!(matches!(err, GateError::BringUpFailed { ref command, .. } if command == "AT+CREG?"));
    assert!(err.is_fatal());
    assert!(!sim.commands().iter().any(|c| c.starts_with("AT+CSTT")));
}

#[tokio::test]
async fn test_silent_modem_fails_startup() {
    let sim = small_sim();
    sim.mute_next(u32::MAX);
    let modem = Modem::new("sim", sim.clone(), fast_timings());

    let err = modem.check_start(&NoopPower).await.unwrap_err();

    assert!(matches!(err, GateError::StartupFailed { attempts: 3 }));
    assert_eq!(sim.count_command("AT"), 3);
    assert_eq!(sim.count_command("ATE1"), 3);
}

#[tokio::test]
async fn test_add_then_find_with_first_free_slot() {
    let sim = small_sim();
    sim.insert_contact(1, "+48100000001", "");
    let store = AuthorizationStore::new(sim_modem(&sim))
        .with_slot_strategy(SlotStrategy::FirstFree)
        .with_contact_name("GATE");

    assert_eq!(store.add("+48222333444").await.unwrap(), AddOutcome::Added);

    let entry = store.find("222333444").await.unwrap().unwrap();
    assert_eq!(entry.index, 2);
    assert_eq!(entry.name, "GATE");
    assert_eq!(store.list_range().await.unwrap(), Some(IndexRange { min: 1, max: 10 }));
    assert_eq!(store.snapshot().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_first_free_fails_on_full_sim() {
    let sim = small_sim();
    for index in 1..=10 {
        sim.insert_contact(index, &format!("+48100000{:03}", index), "");
    }
    let modem = Arc::new(Modem::new("sim", sim.clone(), fast_timings()));
    let store = AuthorizationStore::new(modem).with_slot_strategy(SlotStrategy::FirstFree);

    assert_eq!(store.add("+48222333444").await.unwrap(), AddOutcome::Failed);
    assert_eq!(sim.contacts().len(), 10);
}

#[tokio::test]
async fn test_default_slot_overwrites_slot_one() {
    let sim = small_sim();
    sim.insert_contact(1, "+48100000001", "");
    let store = AuthorizationStore::new(sim_modem(&sim));
    assert_eq!(store.slot_strategy(), SlotStrategy::Fixed(1));

    assert_eq!(store.add("+48222333444").await.unwrap(), AddOutcome::Added);

    let contacts = sim.contacts();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].index, 1);
    assert_eq!(contacts[0].number, "+48222333444");
    assert!(store.find("+48100000001").await.unwrap().is_none());
}

#[tokio::test]
async fn test_garbled_range_is_never_scanned() {
    let sim = small_sim();
    sim.override_reply("AT+CPBR=?", "\r\n+CPBR: (1-4294967295),40,17\r\n\r\nOK\r\n");
    let store = AuthorizationStore::new(sim_modem(&sim));

    assert_eq!(store.list_range().await.unwrap(), None);
    assert!(store.find("+48222333444").await.unwrap().is_none());
    assert_eq!(store.delete("+48222333444").await.unwrap(), DeleteOutcome::Failed);
    assert!(!sim
        .commands()
        .iter()
        .any(|c| c.starts_with("AT+CPBR=") && c != "AT+CPBR=?"));
}
