use criterion::{black_box, criterion_group, criterion_main, Criterion};
use medialistener::dispatch::dispatch_time_update;
use medialistener::{
    build_schedule, CatchUpPolicy, Handler, ListenerId, PlayerId, PlayerSchedule, PlayerState, TriggerConfig,
};

fn busy_schedule(handlers: &[Handler]) -> PlayerSchedule {
    let cfg = TriggerConfig::events(["play", "pause", "ended"])
        .with_percentages(&[1.0, 99.0], &[5.0])
        .with_seconds(&[3.0, 30.0, 300.0], &[10.0, 15.0]);
    let triggers = cfg.normalize();
    let mut schedule = PlayerSchedule::new(Some(600.0));
    for handler in handlers {
        for milestone in build_schedule(&triggers, Some(600.0), 0.0) {
            schedule.register(&milestone, handler, ListenerId(1));
        }
    }
    schedule
}

fn bench_time_update(c: &mut Criterion) {
    let handlers: Vec<Handler> = (0..8).map(|_| Handler::new(|_| {})).collect();

    c.bench_function("timeupdate_full_playback", |b| {
        b.iter(|| {
            let mut schedule = busy_schedule(&handlers);
            let mut fired = 0;
            let mut t = 0.0;
            while t <= 600.0 {
                let state = PlayerState { current_time: t, duration: 600.0, ended: t >= 600.0 };
                fired += dispatch_time_update(&mut schedule, PlayerId(1), &state, CatchUpPolicy::Interval).len();
                t += 0.25;
            }
            black_box(fired)
        })
    });

    c.bench_function("timeupdate_jump_to_end", |b| {
        b.iter(|| {
            let mut schedule = busy_schedule(&handlers);
            let state = PlayerState { current_time: 600.0, duration: 600.0, ended: true };
            black_box(dispatch_time_update(&mut schedule, PlayerId(1), &state, CatchUpPolicy::Interval).len())
        })
    });
}

fn bench_normalize(c: &mut Criterion) {
    let json = r#"{"events": ["play", "pause"], "percentages": {"each": [10, 90], "every": [5, 25]}, "seconds": {"each": [1, 2.5], "every": [10]}}"#;
    let cfg = TriggerConfig::from_json(json).expect("valid config");
    c.bench_function("normalize_triggers", |b| b.iter(|| black_box(cfg.normalize())));
}

criterion_group!(benches, bench_time_update, bench_normalize);
criterion_main!(benches);
