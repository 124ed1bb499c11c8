// Services layer

mod event;

pub use event::EventService;
