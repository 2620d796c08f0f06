use std::error::Error;

use crate::fields::Fields;
use crate::keys;
use crate::logger::Logger;

/// Single-use builder for one event of one [`Logger`].
///
/// Fields accumulate across [`fields`](Segment::fields) calls, later
/// values winning. The terminal severity call consumes the segment.
#[derive(Debug)]
#[must_use = "a segment does nothing until a severity method is called"]
pub struct Segment<'a> {
    logger: &'a Logger,
    event: String,
    fields: Fields,
}

impl<'a> Segment<'a> {
    pub(crate) fn new(logger: &'a Logger, event: &str) -> Self {
        Segment {
            logger,
            event: event.to_string(),
            fields: Fields::new(),
        }
    }

    pub fn fields(mut self, fields: Fields) -> Self {
        for (k, v) in fields {
            self.fields.insert(k, v);
        }
        self
    }

    #[track_caller]
    pub fn debug(self, message: &str) -> String {
        let fields = self.with_message(message);
        self.logger.debug(&self.event, &[fields])
    }

    #[track_caller]
    pub fn info(self, message: &str) -> String {
        let fields = self.with_message(message);
        self.logger.info(&self.event, &[fields])
    }

    #[track_caller]
    pub fn warn(self, message: &str) -> String {
        let fields = self.with_message(message);
        self.logger.warn(&self.event, &[fields])
    }

    #[track_caller]
    pub fn error(self, err: &(dyn Error + 'static)) -> String {
        self.logger.error(&self.event, err, &[self.fields])
    }

    #[track_caller]
    pub fn fatal(self, err: &(dyn Error + 'static)) -> ! {
        self.logger.fatal(&self.event, err, &[self.fields])
    }

    #[track_caller]
    pub fn audit(self, message: &str) -> String {
        let fields = self.with_message(message);
        self.logger.audit(&self.event, &[fields])
    }

    fn with_message(&self, message: &str) -> Fields {
        self.fields.clone().with(keys::MESSAGE, message)
    }
}
