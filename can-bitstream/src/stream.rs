//! Hand-off of live capture bytes to a decoding session
//!
//! The codec itself never locks and must only be driven by one owner. Bytes
//! produced elsewhere (a serial port, a pipe) are read on a dedicated thread
//! and passed through a bounded single-producer/single-consumer channel; the
//! thread that owns the [`Decoder`] drains it.

use crate::decoder::Decoder;
use crate::edge_decoder::FeedSummary;
use crate::types::{CodecError, Result};
use std::io::{self, Read};
use std::sync::mpsc::{sync_channel, Receiver, RecvError, TryRecvError};
use std::thread::{self, JoinHandle};

type Chunk = io::Result<Vec<u8>>;

/// Consumer side of a capture reader thread
pub struct ChunkReceiver {
    rx: Receiver<Chunk>,
    handle: Option<JoinHandle<()>>,
    finished: bool,
}

/// Spawn a thread that reads `reader` in chunks of `chunk_size` bytes
///
/// At most `capacity` chunks are buffered; the reader blocks while the
/// consumer is behind.
pub fn spawn_reader<R>(mut reader: R, chunk_size: usize, capacity: usize) -> Result<ChunkReceiver>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = sync_channel::<Chunk>(capacity.max(1));
    let chunk_size = chunk_size.max(1);

    let handle = thread::Builder::new()
        .name("capture-reader".to_string())
        .spawn(move || loop {
            let mut buf = vec![0u8; chunk_size];
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    buf.truncate(n);
                    if tx.send(Ok(buf)).is_err() {
                        // Consumer went away
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        })?;

    Ok(ChunkReceiver {
        rx,
        handle: Some(handle),
        finished: false,
    })
}

impl ChunkReceiver {
    /// Feed every chunk that is already waiting, without blocking
    pub fn drain_into(&mut self, decoder: &mut Decoder) -> Result<FeedSummary> {
        let mut summary = FeedSummary::default();
        loop {
            match self.rx.try_recv() {
                Ok(chunk) => summary.merge(decoder.feed(&chunk?)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.finished = true;
                    break;
                }
            }
        }
        Ok(summary)
    }

    /// Feed chunks until the producer finishes
    pub fn run_to_end(mut self, decoder: &mut Decoder) -> Result<FeedSummary> {
        let mut summary = FeedSummary::default();
        loop {
            match self.rx.recv() {
                Ok(chunk) => summary.merge(decoder.feed(&chunk?)),
                Err(RecvError) => break,
            }
        }
        self.finished = true;
        self.join()?;
        Ok(summary)
    }

    /// True once the producer has closed the channel and it is drained
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn join(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| CodecError::StreamClosed),
            None => Ok(()),
        }
    }
}
