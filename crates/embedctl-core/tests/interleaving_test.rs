//! Random command sequences against a client whose calls complete in random
//! order. Whatever the interleaving, published snapshots stay consistent and
//! once everything resolves the session shows the latest selection.
#![allow(clippy::unwrap_used)]

mod common;

use std::time::Duration;

use proptest::prelude::*;

use common::{Harness, PendingCall, answer, config_for, reports, workspaces};
use embedctl_core::{CoreError, SessionError, Theme};

const WORKSPACES: [&str; 3] = ["w0", "w1", "w2"];

#[derive(Debug, Clone)]
enum Op {
    Initialize,
    SelectWorkspace(usize),
    SelectReport(usize),
    ToggleTheme,
    Refresh,
    Retry,
    /// Complete one parked call, picked by index modulo the parked count.
    Resolve { pick: usize, succeed: bool },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => Just(Op::Initialize),
        2 => (0..WORKSPACES.len()).prop_map(Op::SelectWorkspace),
        2 => (0..3usize).prop_map(Op::SelectReport),
        1 => Just(Op::ToggleTheme),
        1 => Just(Op::Refresh),
        1 => Just(Op::Retry),
        6 => (any::<usize>(), prop::bool::weighted(0.85))
            .prop_map(|(pick, succeed)| Op::Resolve { pick, succeed }),
    ]
}

fn report_ids(ws: &str) -> [String; 2] {
    [format!("{ws}-r0"), format!("{ws}-r1")]
}

fn resolve(call: PendingCall, succeed: bool) {
    let offline = || CoreError::ConnectionFailed {
        url: "https://api.example".into(),
        reason: "reset by peer".into(),
    };
    match call {
        PendingCall::Workspaces(respond) => {
            answer(respond, if succeed { Ok(workspaces(&WORKSPACES)) } else { Err(offline()) });
        }
        PendingCall::Reports(ws, respond) => {
            let [a, b] = report_ids(ws.as_str());
            let result = if succeed {
                Ok(reports(ws.as_str(), &[a.as_str(), b.as_str()]))
            } else {
                Err(offline())
            };
            answer(respond, result);
        }
        PendingCall::Configuration {
            workspace_id,
            report_id,
            settings,
            respond,
        } => {
            let result = if succeed {
                Ok(config_for(&workspace_id, &report_id, &settings))
            } else {
                Err(offline())
            };
            answer(respond, result);
        }
    }
}

async fn run(ops: Vec<Op>) {
    let mut h = Harness::start();
    let mut parked: Vec<PendingCall> = Vec::new();

    for op in ops {
        match op {
            Op::Initialize => h.controller.initialize().await.unwrap(),
            Op::SelectWorkspace(i) => {
                let outcome = h.controller.select_workspace(WORKSPACES[i]).await;
                assert!(
                    matches!(outcome, Ok(()) | Err(SessionError::InvalidSelection { .. })),
                    "{outcome:?}"
                );
            }
            Op::SelectReport(i) => {
                let ws = h
                    .controller
                    .snapshot()
                    .selected_workspace_id
                    .clone()
                    .map_or_else(|| "w0".to_owned(), |w| w.to_string());
                let outcome = h.controller.select_report(format!("{ws}-r{i}")).await;
                assert!(
                    matches!(outcome, Ok(()) | Err(SessionError::InvalidSelection { .. })),
                    "{outcome:?}"
                );
            }
            Op::ToggleTheme => {
                let mut settings = h.controller.snapshot().settings.clone();
                settings.theme = match settings.theme {
                    Theme::Dark => Theme::Light,
                    _ => Theme::Dark,
                };
                h.controller.update_settings(settings).await.unwrap();
            }
            Op::Refresh => h.controller.refresh().await.unwrap(),
            Op::Retry => h.controller.retry().await.unwrap(),
            Op::Resolve { pick, succeed } => {
                if !parked.is_empty() {
                    let call = parked.remove(pick % parked.len());
                    resolve(call, succeed);
                }
            }
        }

        parked.extend(h.drain_calls().await);
        let snapshot = h.controller.snapshot();
        if let Err(violation) = snapshot.check_invariants() {
            panic!("{violation}\n{snapshot:#?}");
        }
    }

    // Let every outstanding call succeed, including any the cascade issues
    // in response, until nothing is left in flight.
    for _ in 0..32 {
        parked.extend(h.drain_calls().await);
        if parked.is_empty() {
            break;
        }
        for call in parked.drain(..) {
            resolve(call, true);
        }
    }

    let state = tokio::time::timeout(Duration::from_secs(5), h.controller.settled())
        .await
        .expect("session never settled")
        .unwrap();
    assert!(state.check_invariants().is_ok());

    if let Some(config) = &state.active_configuration {
        let theme = format!("theme={}", state.settings.theme);
        assert!(
            config.display_url.as_str().contains(&theme),
            "configuration built with stale settings: {} vs {theme}",
            config.display_url
        );
    } else if state.selected_report_id.is_some() {
        assert!(
            state.last_error.is_some(),
            "report selected, nothing failed, but no configuration: {state:#?}"
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn snapshots_stay_consistent_under_any_interleaving(
        ops in prop::collection::vec(op(), 1..40)
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(run(ops));
    }
}

