#![allow(dead_code)]

use medialistener::{
    Handler, HtmlDocument, ListenerConfig, ListenerContext, MediaHost, MilestoneEvent, PlayerId, TaskQueue,
};
use std::sync::{Arc, Mutex};

pub struct Page {
    pub doc: Arc<HtmlDocument>,
    pub queue: Arc<TaskQueue>,
    pub ctx: Arc<ListenerContext>,
}

impl Page {
    pub fn new(html: &str) -> Self {
        Self::with_config(html, ListenerConfig::default())
    }

    pub fn with_config(html: &str, config: ListenerConfig) -> Self {
        Self::from_doc(HtmlDocument::parse(html).expect("valid page"), config)
    }

    pub fn from_doc(doc: HtmlDocument, config: ListenerConfig) -> Self {
        let doc = Arc::new(doc);
        let queue = Arc::new(TaskQueue::new());
        let ctx = ListenerContext::new(doc.clone(), queue.clone(), config);
        Page { doc, queue, ctx }
    }

    pub fn first(&self) -> PlayerId {
        self.doc.players()[0]
    }

    pub fn load(&self, player: PlayerId, duration: f64) {
        self.doc.load(player, duration, self.ctx.as_ref()).unwrap();
    }

    pub fn play(&self, player: PlayerId) {
        self.doc.play(player, self.ctx.as_ref()).unwrap();
    }

    pub fn pause(&self, player: PlayerId) {
        self.doc.pause(player, self.ctx.as_ref()).unwrap();
    }

    pub fn seek(&self, player: PlayerId, seconds: f64) {
        self.doc.seek(player, seconds, self.ctx.as_ref()).unwrap();
    }

    pub fn advance(&self, player: PlayerId, seconds: f64) {
        self.doc.advance(player, seconds, self.ctx.as_ref()).unwrap();
    }

    /// Load, play to the end (or `duration` seconds for unknown lengths) and
    /// run every deferred handler.
    pub fn play_through(&self, player: PlayerId, duration: f64) {
        self.load(player, duration);
        self.play(player);
        self.advance(player, if duration.is_finite() { duration } else { 60.0 });
        self.queue.run_until_idle();
    }
}

#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<MilestoneEvent>>>);

impl Log {
    pub fn handler(&self) -> Handler {
        let log = self.0.clone();
        Handler::new(move |e| log.lock().unwrap().push(e.clone()))
    }

    pub fn take(&self) -> Vec<MilestoneEvent> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn labels(&self) -> Vec<String> {
        self.take().into_iter().map(|e| e.label).collect()
    }
}
