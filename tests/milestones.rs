mod common;

use common::{Log, Page};
use medialistener::{CatchUpPolicy, HtmlDocument, ListenerConfig, TriggerConfig};

const VIDEO: &str = "<video></video>";

#[test]
fn percentages_fire_in_ascending_order() {
    let page = Page::new(VIDEO);
    let log = Log::default();
    let listener = page.ctx.listener();
    let cfg = TriggerConfig::default().with_percentages(&[10.0, 90.0], &[25.0]);
    listener.on(None, &cfg, &log.handler()).unwrap();

    page.play_through(page.first(), 52.2);

    let events = log.take();
    let labels: Vec<&str> = events.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, vec!["10%", "25%", "50%", "75%", "90%", "100%"]);
    let seconds: Vec<u64> = events.iter().map(|e| e.seconds).collect();
    assert_eq!(seconds, vec![5, 13, 26, 39, 46, 52]);
}

#[test]
fn absolute_and_recurring_seconds() {
    let page = Page::new(VIDEO);
    let log = Log::default();
    let listener = page.ctx.listener();
    listener.on(None, &TriggerConfig::default().with_seconds(&[1.0], &[2.0]), &log.handler()).unwrap();

    page.play_through(page.first(), 9.0);

    let events = log.take();
    let seconds: Vec<u64> = events.iter().map(|e| e.seconds).collect();
    assert_eq!(seconds, vec![1, 2, 4, 6, 8]);
    assert_eq!(events[0].label, "00:00:01");
    assert_eq!(events[4].label, "00:00:08");
}

#[test]
fn sparse_updates_catch_up_missed_intervals() {
    let doc = HtmlDocument::parse(VIDEO).unwrap().with_tick(7.0);
    let page = Page::from_doc(doc, ListenerConfig::default());
    let log = Log::default();
    let listener = page.ctx.listener();
    listener.on(None, &TriggerConfig::default().with_seconds(&[], &[2.0]), &log.handler()).unwrap();

    page.play_through(page.first(), 20.0);

    let seconds: Vec<u64> = log.take().iter().map(|e| e.seconds).collect();
    assert_eq!(seconds, (1..=10).map(|i| i * 2).collect::<Vec<u64>>());
}

#[test]
fn legacy_catch_up_counts_against_armed_offset() {
    let doc = HtmlDocument::parse(VIDEO).unwrap().with_tick(7.0);
    let config = ListenerConfig { catch_up: CatchUpPolicy::Legacy, ..Default::default() };
    let page = Page::from_doc(doc, config);
    let log = Log::default();
    let listener = page.ctx.listener();
    listener.on(None, &TriggerConfig::default().with_seconds(&[], &[2.0]), &log.handler()).unwrap();

    let video = page.first();
    page.load(video, 100.0);
    page.play(video);
    page.advance(video, 7.0);
    page.queue.run_until_idle();

    // floor((7 - 2) / 2) == 2 missed points after the armed one
    let seconds: Vec<u64> = log.take().iter().map(|e| e.seconds).collect();
    assert_eq!(seconds, vec![2, 4, 6]);
}

#[test]
fn unknown_duration_skips_percentages() {
    let page = Page::new(VIDEO);
    let log = Log::default();
    let listener = page.ctx.listener();
    let cfg = TriggerConfig::events(["play"]).with_percentages(&[50.0], &[]).with_seconds(&[3.0], &[]);
    listener.on(None, &cfg, &log.handler()).unwrap();

    page.play_through(page.first(), f64::NAN);

    assert_eq!(log.labels(), vec!["play", "00:00:03"]);
}

#[test]
fn pause_before_ended_is_suppressed() {
    let page = Page::new(VIDEO);
    let log = Log::default();
    let listener = page.ctx.listener();
    listener.on(None, &TriggerConfig::events(["pause", "ended"]), &log.handler()).unwrap();

    let video = page.first();
    page.play_through(video, 3.0);
    assert_eq!(log.labels(), vec!["ended"]);

    page.seek(video, 1.0);
    page.play(video);
    page.pause(video);
    page.queue.run_until_idle();
    let events = log.take();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].label, "pause");
    assert_eq!(events[0].seconds, 1);
}

#[test]
fn pause_at_end_can_be_reported() {
    let config = ListenerConfig { suppress_pause_on_end: false, ..Default::default() };
    let page = Page::with_config(VIDEO, config);
    let log = Log::default();
    let listener = page.ctx.listener();
    listener.on(None, &TriggerConfig::events(["pause", "ended"]), &log.handler()).unwrap();

    page.play_through(page.first(), 3.0);
    assert_eq!(log.labels(), vec!["pause", "ended"]);
}

#[test]
fn overlapping_registrations_fire_once() {
    let page = Page::new(VIDEO);
    let log = Log::default();
    let handler = log.handler();
    let listener = page.ctx.listener();

    listener.on(None, &TriggerConfig::events(["play"]).with_percentages(&[50.0], &[]), &handler).unwrap();
    let wider = TriggerConfig::events(["play", "pause"]).with_percentages(&[50.0], &[]).with_seconds(&[5.0], &[]);
    listener.on(Some("video"), &wider, &handler).unwrap();
    listener.on(Some("video"), &wider, &handler).unwrap();

    page.play_through(page.first(), 10.0);

    // 50% of 10s and the 5s offset land on the same second.
    assert_eq!(log.labels(), vec!["play", "50%"]);
}

#[test]
fn off_removes_expanded_percentages() {
    let page = Page::new(VIDEO);
    let log = Log::default();
    let handler = log.handler();
    let listener = page.ctx.listener();
    let video = page.first();
    page.load(video, 8.0);

    listener.on(None, &TriggerConfig::default().with_percentages(&[], &[25.0]), &handler).unwrap();
    listener.off(None, &TriggerConfig::default().with_percentages(&[50.0], &[]), &handler).unwrap();

    page.play(video);
    page.advance(video, 8.0);
    page.queue.run_until_idle();
    assert_eq!(log.labels(), vec!["25%", "75%", "100%"]);
}

#[test]
fn off_by_seconds_drops_percentage_on_that_second_for_current_source() {
    let page = Page::new(VIDEO);
    let log = Log::default();
    let handler = log.handler();
    let listener = page.ctx.listener();
    let video = page.first();
    page.load(video, 10.0);

    listener.on(None, &TriggerConfig::default().with_percentages(&[50.0], &[]), &handler).unwrap();
    listener.off(None, &TriggerConfig::default().with_seconds(&[5.0], &[]), &handler).unwrap();
    page.play(video);
    page.advance(video, 10.0);
    page.queue.run_until_idle();
    assert!(log.take().is_empty());

    // The registration still asks for 50%, so a new source brings it back.
    page.play_through(video, 10.0);
    assert_eq!(log.labels(), vec!["50%"]);
}

#[test]
fn source_change_resets_schedule() {
    let page = Page::new(VIDEO);
    let log = Log::default();
    let listener = page.ctx.listener();
    let cfg = TriggerConfig::default().with_percentages(&[50.0], &[]).with_seconds(&[1.0], &[]);
    listener.on(None, &cfg, &log.handler()).unwrap();

    let video = page.first();
    page.play_through(video, 10.0);
    let first: Vec<u64> = log.take().iter().map(|e| e.seconds).collect();
    assert_eq!(first, vec![1, 5]);

    page.play_through(video, 4.0);
    let second: Vec<u64> = log.take().iter().map(|e| e.seconds).collect();
    assert_eq!(second, vec![1, 2]);
}

#[test]
fn replaying_same_source_does_not_refire() {
    let page = Page::new(VIDEO);
    let log = Log::default();
    let listener = page.ctx.listener();
    listener.on(None, &TriggerConfig::default().with_seconds(&[2.0], &[]), &log.handler()).unwrap();

    let video = page.first();
    page.play_through(video, 5.0);
    assert_eq!(log.labels(), vec!["00:00:02"]);

    // Restarting after the end keeps the source, so the cache holds.
    page.play(video);
    page.advance(video, 5.0);
    page.queue.run_until_idle();
    assert!(log.take().is_empty());
}

#[test]
fn selector_limits_players() {
    let page = Page::new(r#"<video id="a"></video><audio id="b"></audio>"#);
    let log = Log::default();
    let listener = page.ctx.listener();
    listener.on(Some("#a"), &TriggerConfig::events(["play"]), &log.handler()).unwrap();

    for player in [medialistener::PlayerId(1), medialistener::PlayerId(2)] {
        page.play_through(player, 2.0);
    }

    let events = log.take();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].player, medialistener::PlayerId(1));
}

#[test]
fn handlers_see_each_player_separately() {
    let page = Page::new("<video></video><video></video>");
    let log = Log::default();
    let listener = page.ctx.listener();
    listener.on(None, &TriggerConfig::default().with_percentages(&[100.0], &[]), &log.handler()).unwrap();

    page.play_through(medialistener::PlayerId(1), 4.0);
    page.play_through(medialistener::PlayerId(2), 6.0);

    let events = log.take();
    let fired: Vec<(u64, u64)> = events.iter().map(|e| (e.player.0, e.seconds)).collect();
    assert_eq!(fired, vec![(1, 4), (2, 6)]);
}
