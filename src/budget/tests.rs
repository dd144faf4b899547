//! Tests for the budget module

use super::*;
use crate::provider::BudgetSignal;
use crate::sleep::RecordingSleeper;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;

fn budget(strategy: BudgetStrategy) -> (RateBudget, RecordingSleeper) {
    let sleeper = RecordingSleeper::new();
    (RateBudget::new(strategy, Arc::new(sleeper.clone())), sleeper)
}

fn signal(available: f64, maximum: f64, restore_rate: f64, cost: f64) -> BudgetSignal {
    BudgetSignal {
        available: Some(available),
        maximum: Some(maximum),
        restore_rate: Some(restore_rate),
        cost: Some(cost),
    }
}

#[tokio::test]
async fn test_no_delay_before_first_call() {
    for strategy in [
        BudgetStrategy::default(),
        BudgetStrategy::adaptive(),
        BudgetStrategy::ceiling(10, Duration::from_secs(60)),
    ] {
        let (mut budget, sleeper) = budget(strategy);
        assert_eq!(budget.before_call().await, Duration::ZERO);
        assert!(sleeper.non_zero_delays().is_empty());
    }
}

#[tokio::test]
async fn test_fixed_delay_between_calls() {
    let (mut budget, sleeper) = budget(BudgetStrategy::fixed(Duration::from_millis(250)));

    budget.before_call().await;
    budget.record(None);
    budget.before_call().await;
    budget.record(None);
    budget.before_call().await;

    assert_eq!(
        sleeper.non_zero_delays(),
        vec![Duration::from_millis(250), Duration::from_millis(250)]
    );
    assert_eq!(budget.requests(), 2);
    assert_eq!(budget.total_delay(), Duration::from_millis(500));
}

#[test]
fn test_default_strategy_is_500ms_fixed_delay() {
    assert_eq!(
        BudgetStrategy::default(),
        BudgetStrategy::FixedDelay { min_delay_ms: 500 }
    );
}

#[tokio::test]
async fn test_adaptive_delay_below_threshold_is_cost_over_rate() {
    let (mut budget, sleeper) = budget(BudgetStrategy::adaptive());

    budget.before_call().await;
    budget.record(Some(&signal(400.0, 1000.0, 50.0, 100.0)));

    assert_eq!(budget.next_delay(), Duration::from_secs(2));
    assert_eq!(budget.before_call().await, Duration::from_secs(2));
    assert_eq!(sleeper.non_zero_delays(), vec![Duration::from_secs(2)]);
    assert_eq!(budget.remaining(), Some(400.0));
}

#[test_case(600.0, Duration::ZERO ; "above threshold")]
#[test_case(500.0, Duration::ZERO ; "at threshold")]
#[test_case(499.0, Duration::from_secs(2) ; "just below threshold")]
#[test_case(0.0, Duration::from_secs(2) ; "empty bucket")]
fn test_adaptive_threshold(available: f64, expected: Duration) {
    let (mut budget, _) = budget(BudgetStrategy::adaptive());
    budget.record(Some(&signal(available, 1000.0, 50.0, 100.0)));
    assert_eq!(budget.next_delay(), expected);
}

#[test]
fn test_adaptive_min_delay_floor() {
    let (mut budget, _) = budget(BudgetStrategy::Adaptive {
        threshold: 0.5,
        min_delay_ms: 3000,
        fallback_delay_ms: 500,
        maximum: None,
        restore_rate: None,
    });
    budget.record(Some(&signal(100.0, 1000.0, 50.0, 100.0)));
    assert_eq!(budget.next_delay(), Duration::from_secs(3));
}

#[test]
fn test_adaptive_unknown_available_uses_fallback() {
    let (mut budget, _) = budget(BudgetStrategy::adaptive());
    budget.record(None);
    assert_eq!(budget.next_delay(), Duration::from_millis(500));
    assert_eq!(budget.remaining(), None);
}

#[test]
fn test_adaptive_cost_only_signal_decays_estimate() {
    let (mut budget, _) = budget(BudgetStrategy::Adaptive {
        threshold: 0.5,
        min_delay_ms: 0,
        fallback_delay_ms: 500,
        maximum: Some(1000.0),
        restore_rate: Some(0.0001),
    });

    let cost_only = BudgetSignal {
        cost: Some(300.0),
        ..BudgetSignal::default()
    };

    budget.record(Some(&cost_only));
    let first = budget.remaining().unwrap();
    assert!((first - 700.0).abs() < 0.01);
    assert_eq!(budget.next_delay(), Duration::ZERO);

    budget.record(Some(&cost_only));
    let second = budget.remaining().unwrap();
    assert!((second - 400.0).abs() < 0.01);
    assert!(budget.next_delay() > Duration::from_secs(1_000_000));
}

#[test]
fn test_adaptive_estimate_never_negative() {
    let (mut budget, _) = budget(BudgetStrategy::Adaptive {
        threshold: 0.5,
        min_delay_ms: 0,
        fallback_delay_ms: 500,
        maximum: Some(100.0),
        restore_rate: Some(10.0),
    });
    let cost_only = BudgetSignal {
        cost: Some(250.0),
        ..BudgetSignal::default()
    };
    budget.record(Some(&cost_only));
    assert_eq!(budget.remaining(), Some(0.0));
    assert_eq!(budget.next_delay(), Duration::from_secs(25));
}

#[test]
fn test_adaptive_missing_restore_rate_falls_back() {
    let (mut budget, _) = budget(BudgetStrategy::adaptive());
    budget.record(Some(&BudgetSignal {
        available: Some(10.0),
        maximum: Some(1000.0),
        restore_rate: None,
        cost: Some(100.0),
    }));
    assert_eq!(budget.next_delay(), Duration::from_millis(500));
}

#[tokio::test]
async fn test_request_ceiling_waits_after_burst() {
    let (mut budget, sleeper) = budget(BudgetStrategy::ceiling(2, Duration::from_secs(10)));

    for _ in 0..3 {
        budget.before_call().await;
        budget.record(None);
    }

    let delays = sleeper.non_zero_delays();
    assert_eq!(delays.len(), 1);
    assert!(delays[0] <= Duration::from_secs(5));
    assert_eq!(budget.requests(), 3);
}

#[test]
fn test_strategy_serde() {
    let strategy: BudgetStrategy =
        serde_yaml::from_str("type: request_ceiling\nmax_requests: 1000").unwrap();
    assert_eq!(
        strategy,
        BudgetStrategy::RequestCeiling {
            max_requests: 1000,
            window_secs: 3600
        }
    );

    let strategy: BudgetStrategy = serde_yaml::from_str("type: adaptive").unwrap();
    assert_eq!(strategy, BudgetStrategy::adaptive());
    assert_eq!(strategy.name(), "adaptive");
}

#[test]
fn test_strategy_validation() {
    assert!(BudgetStrategy::ceiling(0, Duration::from_secs(60))
        .validate()
        .is_err());
    assert!(BudgetStrategy::Adaptive {
        threshold: 1.5,
        min_delay_ms: 0,
        fallback_delay_ms: 500,
        maximum: None,
        restore_rate: None,
    }
    .validate()
    .is_err());
    assert!(BudgetStrategy::adaptive().validate().is_ok());
    assert!(BudgetStrategy::default().validate().is_ok());
}
