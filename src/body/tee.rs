use std::{
    collections::{HashMap, VecDeque},
    fmt,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll, Waker},
};

use bytes::Bytes;
use futures::{
    task::{self as futures_task, ArcWake},
    Stream,
};

use super::BoxByteSource;
use crate::SourceError;

/// Default maximum size in bytes of one retained segment.
pub const DEFAULT_SEGMENT_SIZE: usize = 16 * 1024;

/// Point-in-time view of a tee's retention state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TeeStats {
    /// Number of registered readers (including clones not yet read).
    pub live_readers: usize,
    /// Segments still held because some reader has not passed them.
    pub retained_segments: usize,
    /// Total bytes across retained segments.
    pub retained_bytes: usize,
    /// Segments appended since the tee was created.
    pub appended_segments: u64,
    /// Whether the upstream source has ended or failed.
    pub upstream_finished: bool,
}

#[derive(Debug)]
enum Terminal {
    Eof,
    Failed(SourceError),
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    position: u64,
    saw_terminal: bool,
}

/// Wakers of every reader currently waiting on upstream.
///
/// Handed to upstream as a single waker so readiness reaches all waiting
/// readers, not just the one that happened to poll last.
#[derive(Debug, Default)]
struct WaiterSet {
    wakers: Mutex<HashMap<u64, Waker>>,
}

impl WaiterSet {
    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Waker>> {
        self.wakers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, id: u64, waker: &Waker) {
        let mut wakers = self.lock();
        match wakers.get_mut(&id) {
            Some(existing) if existing.will_wake(waker) => {}
            Some(existing) => existing.clone_from(waker),
            None => {
                wakers.insert(id, waker.clone());
            }
        }
    }

    fn remove(&self, id: u64) {
        self.lock().remove(&id);
    }

    fn wake_all(&self) {
        let drained: Vec<Waker> = self.lock().drain().map(|(_, waker)| waker).collect();
        for waker in drained {
            waker.wake();
        }
    }
}

impl ArcWake for WaiterSet {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.wake_all();
    }
}

struct TeeState {
    upstream: Option<BoxByteSource>,
    segments: VecDeque<Bytes>,
    base: u64,
    retained_bytes: usize,
    appended_segments: u64,
    segment_size: usize,
    cursors: HashMap<u64, Cursor>,
    next_id: u64,
    terminal: Option<Terminal>,
}

impl TeeState {
    fn take_segment(&mut self, id: u64) -> Option<Bytes> {
        let cursor = self.cursors.get_mut(&id)?;
        let index = usize::try_from(cursor.position.checked_sub(self.base)?).ok()?;
        let segment = self.segments.get(index)?.clone();
        cursor.position += 1;
        self.evict();
        Some(segment)
    }

    fn take_terminal(&mut self, id: u64) -> Option<Option<Result<Bytes, SourceError>>> {
        let terminal = self.terminal.as_ref()?;
        let cursor = self.cursors.get_mut(&id)?;
        if cursor.saw_terminal {
            return Some(None);
        }

        cursor.saw_terminal = true;
        Some(match terminal {
            Terminal::Eof => None,
            Terminal::Failed(err) => Some(Err(err.clone())),
        })
    }

    fn append(&mut self, mut chunk: Bytes) {
        while !chunk.is_empty() {
            let take = chunk.len().min(self.segment_size);
            let segment = chunk.split_to(take);
            self.retained_bytes += segment.len();
            self.appended_segments += 1;
            self.segments.push_back(segment);
        }
    }

    fn finish(&mut self, terminal: Terminal) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            appended_segments = self.appended_segments,
            failed = matches!(terminal, Terminal::Failed(_)),
            "tee: upstream finished"
        );

        self.terminal = Some(terminal);
        self.upstream = None;
    }

    fn evict(&mut self) {
        let floor = self
            .cursors
            .values()
            .map(|cursor| cursor.position)
            .min()
            .unwrap_or(self.base + self.segments.len() as u64);

        while self.base < floor {
            let Some(segment) = self.segments.pop_front() else {
                break;
            };
            self.retained_bytes -= segment.len();
            self.base += 1;
        }
    }

    fn register_at(&mut self, position: u64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.cursors.insert(
            id,
            Cursor {
                position,
                saw_terminal: false,
            },
        );
        id
    }
}

/// Single-writer, multi-reader arena fed by one upstream source.
pub(crate) struct CloneTee {
    state: Mutex<TeeState>,
    waiters: Arc<WaiterSet>,
    upstream_waker: Waker,
}

impl fmt::Debug for CloneTee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloneTee")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl CloneTee {
    /// Wraps `upstream` and returns the first two readers, both at offset zero.
    pub(crate) fn split(upstream: BoxByteSource, segment_size: usize) -> (TeeCursor, TeeCursor) {
        let waiters = Arc::new(WaiterSet::default());
        let upstream_waker = futures_task::waker(Arc::clone(&waiters));
        let tee = Arc::new(Self {
            state: Mutex::new(TeeState {
                upstream: Some(upstream),
                segments: VecDeque::new(),
                base: 0,
                retained_bytes: 0,
                appended_segments: 0,
                segment_size: segment_size.max(1),
                cursors: HashMap::new(),
                next_id: 0,
                terminal: None,
            }),
            waiters,
            upstream_waker,
        });

        #[cfg(feature = "tracing")]
        tracing::debug!(segment_size, "tee: created");

        let first = TeeCursor::register(&tee, 0);
        let second = TeeCursor::register(&tee, 0);
        (first, second)
    }

    fn lock(&self) -> MutexGuard<'_, TeeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn stats(&self) -> TeeStats {
        let state = self.lock();
        TeeStats {
            live_readers: state.cursors.len(),
            retained_segments: state.segments.len(),
            retained_bytes: state.retained_bytes,
            appended_segments: state.appended_segments,
            upstream_finished: state.terminal.is_some(),
        }
    }

    fn poll_cursor(
        &self,
        id: u64,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, SourceError>>> {
        let mut guard = self.lock();
        let state = &mut *guard;

        loop {
            if let Some(segment) = state.take_segment(id) {
                return Poll::Ready(Some(Ok(segment)));
            }

            if let Some(item) = state.take_terminal(id) {
                return Poll::Ready(item);
            }

            let Some(upstream) = state.upstream.as_mut() else {
                return Poll::Ready(None);
            };

            // Register before polling so a wake racing with this poll is not lost.
            self.waiters.register(id, cx.waker());
            let mut upstream_cx = Context::from_waker(&self.upstream_waker);
            match upstream.as_mut().poll_next(&mut upstream_cx) {
                Poll::Ready(Some(Ok(chunk))) => state.append(chunk),
                Poll::Ready(Some(Err(err))) => state.finish(Terminal::Failed(err)),
                Poll::Ready(None) => state.finish(Terminal::Eof),
                Poll::Pending => return Poll::Pending,
            }

            // New bytes or a terminal state: every waiting reader can make progress.
            self.waiters.remove(id);
            self.waiters.wake_all();
        }
    }

    fn deregister(&self, id: u64) {
        {
            let mut state = self.lock();
            state.cursors.remove(&id);
            if state.cursors.is_empty() {
                state.segments.clear();
                state.retained_bytes = 0;
                state.upstream = None;
            } else {
                state.evict();
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(
                live_readers = state.cursors.len(),
                retained_bytes = state.retained_bytes,
                "tee: reader released"
            );
        }

        // The released reader may have been the one upstream would have woken.
        self.waiters.remove(id);
        self.waiters.wake_all();
    }
}

/// One registered reader of a [`CloneTee`].
pub(crate) struct TeeCursor {
    tee: Arc<CloneTee>,
    id: u64,
}

impl fmt::Debug for TeeCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeeCursor").field("id", &self.id).finish()
    }
}

impl TeeCursor {
    fn register(tee: &Arc<CloneTee>, position: u64) -> Self {
        let id = tee.lock().register_at(position);

        #[cfg(feature = "tracing")]
        tracing::debug!(reader = id, position, "tee: reader registered");

        Self {
            tee: Arc::clone(tee),
            id,
        }
    }

    /// Registers a new reader starting at this reader's current offset.
    pub(crate) fn fork(&self) -> Self {
        let position = {
            let state = self.tee.lock();
            state
                .cursors
                .get(&self.id)
                .map_or(state.base, |cursor| cursor.position)
        };
        Self::register(&self.tee, position)
    }

    pub(crate) fn stats(&self) -> TeeStats {
        self.tee.stats()
    }
}

impl Stream for TeeCursor {
    type Item = Result<Bytes, SourceError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.tee.poll_cursor(self.id, cx)
    }
}

impl Drop for TeeCursor {
    fn drop(&mut self) {
        self.tee.deregister(self.id);
    }
}
