//! Retry, reconnect and error-surfacing behaviour of the executor

use redoer::test_utils::{RecordingSleeper, ScriptedFactory};
use redoer::{ConnectionError, Executor, RetryPolicy, Value};
use std::io;
use std::time::Duration;

fn executor_for(factory: &ScriptedFactory) -> (Executor, RecordingSleeper) {
    let sleeper = RecordingSleeper::default();
    let executor = Executor::new(factory.clone()).with_sleeper(sleeper.clone());
    (executor, sleeper)
}

fn secs(values: &[u64]) -> Vec<Duration> {
    values.iter().map(|s| Duration::from_secs(*s)).collect()
}

#[test]
fn test_steady_success_dials_once() {
    let factory = ScriptedFactory::new();
    let (executor, sleeper) = executor_for(&factory);

    for _ in 0..3 {
        factory.reply_next(Ok(Value::Int(42)));
        let reply = executor.execute("GET", &["k".into()]).unwrap();
        assert_eq!(reply, Value::Int(42));
    }

    assert_eq!(factory.dial_attempts(), 1);
    assert_eq!(factory.created(), 1);
    assert_eq!(factory.closed(), 0);
    assert!(sleeper.sleeps().is_empty());
}

#[test]
fn test_eof_triggers_reconnect_and_retry() {
    let factory = ScriptedFactory::new();
    factory.reply_next(Err(ConnectionError::Eof));
    factory.reply_next(Ok(Value::Status("OK".to_string())));
    let (executor, sleeper) = executor_for(&factory);

    let reply = executor
        .execute("SET", &["k".into(), "v".into()])
        .unwrap();

    assert_eq!(reply, Value::Status("OK".to_string()));
    assert_eq!(factory.created(), 2);
    assert_eq!(factory.closed(), 1);
    assert_eq!(factory.last_command().as_deref(), Some("SET[k v]"));
    assert_eq!(sleeper.sleeps(), secs(&[0]));
}

#[test]
fn test_application_error_is_not_retried() {
    let factory = ScriptedFactory::new();
    let (executor, sleeper) = executor_for(&factory);
    let custom = ConnectionError::Server("ERR unknown command 'BADCMD'".to_string());

    for _ in 0..3 {
        factory.reply_next(Err(custom.clone()));
        let err = executor.execute("BADCMD", &[]).unwrap_err();
        assert_eq!(err, custom);
    }

    assert_eq!(factory.executed(), 3);
    assert_eq!(factory.created(), 1);
    assert_eq!(factory.closed(), 0);
    assert!(executor.is_connected());
    assert!(sleeper.sleeps().is_empty());
}

#[test]
fn test_dial_failures_exhaust_retries() {
    let factory = ScriptedFactory::new();
    let refused = ConnectionError::Dial("connection refused".to_string());
    factory.fail_all_dials(refused.clone());
    let (executor, sleeper) = executor_for(&factory);

    let err = executor.execute("GET", &["k".into()]).unwrap_err();

    assert_eq!(err, refused);
    assert_eq!(factory.dial_attempts(), 5);
    assert_eq!(factory.created(), 0);
    assert_eq!(sleeper.sleeps(), secs(&[0, 1, 2, 3]));
    assert!(!executor.is_connected());
}

#[test]
fn test_transport_failures_exhaust_retries_and_return_last_error() {
    let factory = ScriptedFactory::new();
    for n in 1..=5 {
        factory.reply_next(Err(ConnectionError::Timeout(format!("read timeout #{n}"))));
    }
    let (executor, sleeper) = executor_for(&factory);

    let err = executor.execute("GET", &["k".into()]).unwrap_err();

    assert_eq!(err, ConnectionError::Timeout("read timeout #5".to_string()));
    assert_eq!(factory.executed(), 5);
    assert_eq!(factory.created(), 5);
    assert_eq!(factory.closed(), 5);
    assert_eq!(sleeper.sleeps(), secs(&[0, 1, 2, 3]));
}

#[test]
fn test_transport_failure_redials_before_next_command() {
    let factory = ScriptedFactory::new();
    let policy = RetryPolicy::new(1, Duration::from_secs(1));
    let sleeper = RecordingSleeper::default();
    let executor = Executor::with_policy(factory.clone(), policy).with_sleeper(sleeper.clone());

    executor.execute("PING", &[]).unwrap();
    factory.reply_next(Err(ConnectionError::Eof));
    assert_eq!(executor.execute("GET", &["k".into()]), Err(ConnectionError::Eof));
    assert!(!executor.is_connected());
    assert_eq!(factory.created(), 1);

    executor.execute("GET", &["k".into()]).unwrap();
    assert_eq!(factory.created(), 2);
    assert!(sleeper.sleeps().is_empty());
}

#[test]
fn test_mixed_failures_reconnect_once_per_failure() {
    let factory = ScriptedFactory::new();
    let (executor, _) = executor_for(&factory);

    let tasks: Vec<(Option<ConnectionError>, &str, Vec<Value>)> = vec![
        (Some(ConnectionError::Eof), "TEST1", vec![1.into(), 1.into()]),
        (None, "TEST2", vec![2.into()]),
        (
            Some(ConnectionError::Io {
                kind: io::ErrorKind::ConnectionReset,
                message: "reset by peer".to_string(),
            }),
            "TEST3",
            vec!["three".into(), 3.into()],
        ),
        (Some(ConnectionError::Eof), "TEST4", vec![4.into()]),
        (None, "TEST5", vec![5.into(), "fünf".into()]),
    ];

    let mut failures = 0;
    for (n, (err, command, args)) in tasks.iter().enumerate() {
        if let Some(err) = err {
            factory.reply_next(Err(err.clone()));
            failures += 1;
        }

        let reply = executor.execute(command, args).unwrap();
        assert_eq!(reply, Value::Int(n as i64 + 1));

        let rendered: Vec<String> = args.iter().map(ToString::to_string).collect();
        assert_eq!(
            factory.last_command(),
            Some(format!("{command}[{}]", rendered.join(" ")))
        );
    }

    executor.shutdown();

    assert_eq!(factory.created(), factory.closed());
    assert_eq!(factory.created(), failures + 1);
}

#[test]
fn test_application_error_after_success_keeps_prior_state() {
    let factory = ScriptedFactory::new();
    let (executor, _) = executor_for(&factory);

    assert_eq!(executor.execute("TEST", &[1.into()]).unwrap(), Value::Int(1));

    let custom = ConnectionError::InvalidArgument("custom error".to_string());
    factory.reply_next(Err(custom.clone()));
    assert_eq!(executor.execute("TEST", &[2.into()]), Err(custom));

    assert_eq!(executor.execute("TEST", &[3.into()]).unwrap(), Value::Int(2));
    assert_eq!(factory.created(), 1);
}

#[test]
fn test_closure_factory() {
    let factory = ScriptedFactory::new();
    let inner = factory.clone();
    let executor = Executor::new(move || {
        use redoer::ConnectionFactory;
        inner.connect()
    });

    assert_eq!(executor.execute("PING", &[]).unwrap(), Value::Int(1));
    assert_eq!(factory.created(), 1);
}
