use super::*;
use crate::config::DecoratorConfig;
use crate::decorator::Decorator;
use crate::name_format::CallableMeta;
use crate::providers::{ManualClock, ScriptedMemory};
use std::time::Duration;

#[test]
fn test_format_duration_seventy_seconds() {
    assert_eq!(format_duration(Duration::from_secs(70)), "0h 1m 10.0000s");
}

#[test]
fn test_format_duration_pads_seconds() {
    assert_eq!(format_duration(Duration::from_millis(5_500)), "0h 0m 05.5000s");
    assert_eq!(format_duration(Duration::ZERO), "0h 0m 00.0000s");
}

#[test]
fn test_format_duration_hours() {
    let duration = Duration::from_secs(2 * 3600 + 3 * 60 + 4) + Duration::from_micros(300);
    assert_eq!(format_duration(duration), "2h 3m 04.0003s");
}

#[test]
fn test_format_bytes_components() {
    assert_eq!(format_bytes(0), "0MB 0KB 0B");
    assert_eq!(format_bytes(1023), "0MB 0KB 1023B");
    assert_eq!(format_bytes(1024), "0MB 1KB 0B");
    assert_eq!(format_bytes(3 * 1024 * 1024 + 2 * 1024 + 1), "3MB 2KB 1B");
}

#[test]
fn test_format_bytes_negative() {
    assert_eq!(format_bytes(-(1024 + 5)), "-1MB 1022KB 1019B");
    assert_eq!(format_bytes(-1), "-1MB 1023KB 1023B");
    assert_eq!(format_bytes(-(1024 * 1024)), "-1MB 0KB 0B");
}

#[test]
fn test_reading_checked_add() {
    let a = Reading::Elapsed(Duration::from_secs(1));
    let b = Reading::Elapsed(Duration::from_secs(2));
    assert_eq!(a.checked_add(&b), Some(Reading::Elapsed(Duration::from_secs(3))));
    assert_eq!(Reading::Bytes(-4).checked_add(&Reading::Bytes(10)), Some(Reading::Bytes(6)));
    assert_eq!(a.checked_add(&Reading::Bytes(1)), None);
    assert_eq!(Reading::Bytes(9).zero_like(), Reading::Bytes(0));
}

#[test]
fn test_field_display() {
    let field = Field::new(Timer::DATA_NAME, Reading::Elapsed(Duration::from_secs(70)));
    assert_eq!(field.to_string(), "runtime : 0h 1m 10.0000s");
    let field = Field::new(Memory::DATA_NAME, Reading::Bytes(2048));
    assert_eq!(field.to_string(), "memory usage : 0MB 2KB 0B");
}

#[test]
fn test_timer_reports_seventy_seconds() {
    let clock = Rc::new(ManualClock::new());
    let timer = Timer::decorator(DecoratorConfig::default(), clock.clone());
    let sleeper = {
        let clock = Rc::clone(&clock);
        move |units: u64| {
            clock.advance(Duration::from_secs(units));
            units
        }
    };
    let wrapped = timer
        .apply(CallableMeta::function("sleeper", "tests"), sleeper)
        .unwrap();

    assert_eq!(wrapped.call(70).unwrap(), 70);
    let reading = timer.hook().last_reading().unwrap();
    assert_eq!(reading, Reading::Elapsed(Duration::from_secs(70)));
    assert_eq!(reading.to_string(), "0h 1m 10.0000s");
}

#[test]
fn test_memory_counts_retained_result() {
    let probe = Rc::new(ScriptedMemory::new([1_000, 1_000 + 4 * 1024]));
    let memory = Memory::decorator(DecoratorConfig::default(), probe.clone());
    let wrapped = memory
        .apply(CallableMeta::function("alloc", "tests"), |n: usize| vec![0u8; n])
        .unwrap();

    let buffer = wrapped.call(4096).unwrap();
    assert_eq!(buffer.len(), 4096);
    assert_eq!(memory.hook().last_reading(), Some(Reading::Bytes(4 * 1024)));
    assert_eq!(probe.remaining(), 0);
}

#[test]
fn test_memory_negative_delta() {
    let probe = Rc::new(ScriptedMemory::new([8_192, 4_096]));
    let utility = Memory::new(probe);
    let before = utility.begin().unwrap();
    assert_eq!(utility.finish(before).unwrap(), Reading::Bytes(-4_096));
}

#[test]
fn test_failed_begin_skips_target() {
    let clock = Rc::new(ManualClock::new());
    clock.stop();
    let timer = Timer::decorator(DecoratorConfig::default(), clock);
    let called = Cell::new(false);
    let wrapped = timer
        .apply(CallableMeta::function("probe", "tests"), |_: ()| called.set(true))
        .unwrap();

    let err = wrapped.call(()).unwrap_err();
    assert!(matches!(err, DecoError::MeasurementUnavailable { .. }));
    assert!(!called.get());
    assert!(timer.hook().last_reading().is_none());
}

#[test]
fn test_failed_finish_is_fatal() {
    // One sample only: begin succeeds, finish has nothing left
    let probe = Rc::new(ScriptedMemory::new([512]));
    let memory = Memory::decorator(DecoratorConfig::default(), probe);
    let called = Cell::new(0);
    let wrapped = memory
        .apply(CallableMeta::function("probe", "tests"), |_: ()| {
            called.set(called.get() + 1)
        })
        .unwrap();

    assert!(wrapped.call(()).is_err());
    assert_eq!(called.get(), 1);
}

#[test]
fn test_deactivated_timer_takes_no_sample() {
    let clock = Rc::new(ManualClock::new());
    clock.stop();
    let timer = Timer::decorator(DecoratorConfig::deactivated(), clock);
    let wrapped = timer
        .apply(CallableMeta::function("noop", "tests"), |x: i32| x + 1)
        .unwrap();
    assert_eq!(wrapped.call(1).unwrap(), 2);
}

#[test]
fn test_mismatched_observation() {
    let timer = Timer::default();
    let err = timer.finish(Observation::Resident(3)).unwrap_err();
    assert!(matches!(
        err,
        DecoError::MeasurementUnavailable {
            provider: "runtime",
            ..
        }
    ));
}

#[test]
fn test_instantiate_builtin_kinds() {
    let providers = Providers::new(Rc::new(ManualClock::new()), Rc::new(ScriptedMemory::default()));
    assert_eq!(instantiate(UtilityKind::Timer, &providers).data_name(), "runtime");
    assert_eq!(instantiate(UtilityKind::Memory, &providers).data_name(), "memory usage");
    for kind in UtilityKind::BUILTIN {
        assert_eq!(data_name_of(kind), instantiate(kind, &providers).data_name());
    }
}

#[test]
fn test_reporting_with_generic_decorator() {
    let clock = Rc::new(ManualClock::new());
    let decorator: Decorator<Reporting<Timer>> =
        Decorator::with_hook(DecoratorConfig::default(), Reporting::new(Timer::new(clock)));
    assert!(decorator.hook().last_reading().is_none());
    assert_eq!(decorator.hook().utility().data_name(), "runtime");
}
