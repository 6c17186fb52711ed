use std::io::Write;
use std::marker::PhantomData;

use parking_lot::Mutex;

use super::{EventConsumer, EventMapper, OutputError, SharedWriter};

/// Maps each event and writes it as one line to a shared writer.
pub struct MappedConsumer<E: ?Sized, M> {
    mapper: M,
    writer: SharedWriter,
    _event: PhantomData<fn(&E)>,
}

impl<E: ?Sized, M: EventMapper<E>> MappedConsumer<E, M> {
    pub fn new(mapper: M, writer: SharedWriter) -> Self {
        Self {
            mapper,
            writer,
            _event: PhantomData,
        }
    }
}

impl<E: ?Sized, M: EventMapper<E>> EventConsumer<E> for MappedConsumer<E, M> {
    fn consume(&self, event: &E) -> Result<(), OutputError> {
        let line = self.mapper.map(event)?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{line}")?;
        // Tailing output should show up as it arrives.
        writer.flush()?;
        Ok(())
    }
}

/// Keeps mapped events in memory instead of printing them.
pub struct CollectingConsumer<E: ?Sized, M> {
    mapper: M,
    lines: Mutex<Vec<String>>,
    _event: PhantomData<fn(&E)>,
}

impl<E: ?Sized, M: EventMapper<E>> CollectingConsumer<E, M> {
    pub fn new(mapper: M) -> Self {
        Self {
            mapper,
            lines: Mutex::new(Vec::new()),
            _event: PhantomData,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl<E: ?Sized, M: EventMapper<E>> EventConsumer<E> for CollectingConsumer<E, M> {
    fn consume(&self, event: &E) -> Result<(), OutputError> {
        let line = self.mapper.map(event)?;
        self.lines.lock().push(line);
        Ok(())
    }
}
