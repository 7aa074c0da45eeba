// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Inter-processor communication between the ARM core and the two DSPs.
//!
//! Each core runs one `Ipc` instance. Cores exchange 32-bit words over a
//! single-producer single-consumer queue per ordered core pair, and notify
//! each other with mailbox events.
//!
//! Link setup
//! ----------
//!
//! On `init` a core resets its local queues, publishes the addresses of its
//! descriptors in its row of the shared link table and pulls the rows of the
//! peers that are already up. Pulling a peer points the local send mirror at
//! the peer's receive buffer and cross-links the indices. The core then
//! sends its lifecycle management event to every peer. A peer receiving that
//! event pulls the new core's row in turn and, if it had torn the link down
//! before, republishes its own descriptors and answers with its own
//! management event.
//!
//! On `terminate` a core withdraws its descriptors and announces itself
//! again. Peers seeing the withdrawn row tear their side of the link down.
//!
//! Every row also carries an init generation. A peer that sees a new
//! generation on a link it believed active knows the other core restarted
//! without its termination being observed, and rebuilds the link. The
//! restarted core holds off linking until the peer's row shows it linked
//! with the new generation.
//!
//! Events
//! ------
//!
//! Events 26 to 28 are the management events of cores 0 to 2 and events 29
//! to 31 their data events. The remaining events are free for clients. An
//! event is only raised on a core whose published event mask has it set.
//!
//! `handle_interrupt` must be called from the mailbox interrupt. `init`
//! should run with that interrupt masked.
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let ipc = Ipc::new(&port);
//! ipc.init(Some(&receiver), 0)?;
//! ipc.send(CoreId::Dsp1, 0x1234)?;
//! ```

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::config;
use crate::core_id::{CoreId, NUM_CORES};
use crate::errorcode::ErrorCode;
use crate::mailbox::{self, MailboxOp, MAX_EVENTS};
use crate::mmap::{mmap, Address};
use crate::port::Port;
use crate::queue::{self, IpcMemory, QueueState, BUFFER, RD_INDEX, SIZE, WR_INDEX};

/// Receives notification of incoming messages.
pub trait QueueClient {
    /// A message from `from` is waiting. `context` is the value passed to
    /// `init`.
    fn message_received(&self, from: CoreId, context: usize);
}

/// Receives a mailbox event registered with `register_handler`.
pub trait EventClient {
    /// `event` was raised on this core. `context` is the value passed to
    /// `register_handler`.
    fn event(&self, event: u32, context: usize);
}

/// State of the link with a peer, as seen from this core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    /// The peer's descriptors have never been pulled.
    Uninitialized,
    /// Both queues with the peer are usable from this side.
    Active,
    /// The link was torn down by a termination.
    Terminated,
}

/// Whether a peer can currently be reached through the queues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoreStatus {
    Connected,
    NotConnected,
}

/// Outcome of sending an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The event was raised on the target core.
    Raised,
    /// The target has no handler for the event, nothing was written.
    Masked,
}

#[derive(Clone, Copy)]
enum Handler<'a> {
    Manage(CoreId),
    Data(CoreId),
    Client(&'a dyn EventClient, usize),
}

#[derive(Clone, Copy)]
struct Link {
    state: LinkState,
    /// Init generation of the peer when the link was last pulled.
    generation: u32,
}

impl Link {
    const fn new() -> Link {
        Link {
            state: LinkState::Uninitialized,
            generation: 0,
        }
    }
}

pub struct Ipc<'a, P: Port> {
    port: &'a P,
    handlers: [Cell<Option<Handler<'a>>>; MAX_EVENTS as usize],
    /// Local copies of each core's published event mask, our own included.
    event_mask: [Cell<u32>; NUM_CORES],
    links: [Cell<Link>; NUM_CORES],
    queue_client: Cell<Option<(&'a dyn QueueClient, usize)>>,
}

impl<'a, P: Port> Ipc<'a, P> {
    pub fn new(port: &'a P) -> Ipc<'a, P> {
        Ipc {
            port,
            handlers: core::array::from_fn(|_| Cell::new(None)),
            event_mask: core::array::from_fn(|_| Cell::new(0)),
            links: core::array::from_fn(|_| Cell::new(Link::new())),
            queue_client: Cell::new(None),
        }
    }

    pub fn core_id(&self) -> CoreId {
        self.port.core_id()
    }

    fn memory(&self) -> &IpcMemory {
        self.port.memory()
    }

    fn remote(&self, addr: Address) -> Result<&AtomicU32, ErrorCode> {
        self.port.word(addr).ok_or(ErrorCode::NOTINIT)
    }

    /// Set up IPC on this core and connect to the peers that are up.
    ///
    /// `client` is told about every incoming message, with `context`.
    pub fn init(
        &self,
        client: Option<&'a dyn QueueClient>,
        context: usize,
    ) -> Result<(), ErrorCode> {
        let me = self.core_id();
        let row = self.port.shared().row(me);

        for handler in self.handlers.iter() {
            handler.set(None);
        }
        for mask in self.event_mask.iter() {
            mask.set(0);
        }
        for link in self.links.iter() {
            link.set(Link::new());
        }
        self.queue_client.set(client.map(|client| (client, context)));

        let generation = row.next_generation(me);

        // Handlers first, so a peer that pulls our row below already sees a
        // mask that accepts its management event.
        for core in CoreId::ALL {
            self.handlers[mailbox::manage_event(core) as usize].set(Some(Handler::Manage(core)));
            self.handlers[mailbox::data_event(core) as usize].set(Some(Handler::Data(core)));
        }
        self.set_own_mask(mailbox::RESERVED_EVENTS);
        self.port.fence();

        for core in CoreId::ALL {
            row.set_linked_generation(me, core, 0);
            self.reset_local(core);
            self.publish(core);
        }
        self.port.fence();

        for core in CoreId::ALL {
            if let Err(e) = self.pull(core) {
                if config::CONFIG.trace_ipc {
                    log::trace!("[{:?}] {:?} not up yet ({:?})", me, core, e);
                }
            }
        }

        if config::CONFIG.trace_ipc {
            log::trace!("[{:?}] IPC up, generation {}", me, generation);
        }
        self.announce()
    }

    /// Tear down IPC on this core and tell the peers.
    pub fn terminate(&self) -> Result<(), ErrorCode> {
        let me = self.core_id();
        let row = self.port.shared().row(me);

        for handler in self.handlers.iter() {
            handler.set(None);
        }
        self.set_own_mask(0);

        for core in CoreId::ALL {
            row.publish(me, core, Address::NULL, Address::NULL);
            self.memory().clear_queues(core);
            self.links[core.index()].set(Link {
                state: LinkState::Terminated,
                ..self.links[core.index()].get()
            });
        }
        self.port.fence();

        if config::CONFIG.trace_ipc {
            log::trace!("[{:?}] IPC terminated", me);
        }
        self.announce()
    }

    pub fn link_state(&self, core: CoreId) -> LinkState {
        self.links[core.index()].get().state
    }

    pub fn core_status(&self, core: CoreId) -> CoreStatus {
        match self.link_state(core) {
            LinkState::Active => CoreStatus::Connected,
            LinkState::Uninitialized | LinkState::Terminated => CoreStatus::NotConnected,
        }
    }

    /// Our copy of the event mask published by `core`.
    pub fn event_mask(&self, core: CoreId) -> u32 {
        self.event_mask[core.index()].get()
    }

    fn set_own_mask(&self, mask: u32) {
        let me = self.core_id();
        self.event_mask[me.index()].set(mask);
        self.port.shared().row(me).set_event_mask(me, mask);
    }

    /// Send our management event to every peer.
    fn announce(&self) -> Result<(), ErrorCode> {
        let me = self.core_id();
        for core in me.others() {
            self.event_send(core, mailbox::manage_event(me))?;
        }
        Ok(())
    }

    /// Make our receive queue for `peer` empty and ready, and forget our send
    /// mirror towards it.
    fn reset_local(&self, peer: CoreId) {
        let buffer = self
            .port
            .memory_base()
            .offset(IpcMemory::buffer_offset(peer));
        self.memory().reset_queues(peer, buffer.0);
    }

    /// Publish our descriptors for `peer` in our row.
    fn publish(&self, peer: CoreId) {
        let me = self.core_id();
        let base = self.port.memory_base();
        self.port.shared().row(me).publish(
            me,
            peer,
            base.offset(IpcMemory::tx_offset(peer)),
            base.offset(IpcMemory::rx_offset(peer)),
        );
    }

    /// Connect our queues with `from` using the descriptors it published.
    ///
    /// Our send mirror is pointed at `from`'s receive buffer, and each of our
    /// indices is linked to the index it has to keep in step with on the
    /// other side. The current value of each index we own is written across
    /// so both sides agree.
    fn pull(&self, from: CoreId) -> Result<(), ErrorCode> {
        let me = self.core_id();
        let row = self.port.shared().row(from);

        let link = row.link(me);
        let (write_descr, read_descr) = (link.write_descr(), link.read_descr());
        // `from` publishes its mask before its descriptors, so reading it
        // second never pairs new descriptors with a stale mask. The mask is
        // kept even without a link, to be able to announce ourselves.
        self.event_mask[from.index()].set(row.event_mask());
        if write_descr.is_null() || read_descr.is_null() {
            return Err(ErrorCode::NOTINIT);
        }
        let generation = row.generation();
        // `from` is still linked with an earlier init of ours and resets its
        // queues for us once it sees our management event. It tells us when
        // that is done; linking before would pair our indices with stale ones.
        let linked = row.linked_generation(me);
        if linked != 0 && linked != self.port.shared().row(me).generation() {
            return Err(ErrorCode::NOTINIT);
        }

        // `from`'s send mirror towards us and its receive descriptor for us.
        let remote_tx = mmap(write_descr, from, me);
        let remote_rx = mmap(read_descr, from, me);

        let remote_rx_wr = self.remote(remote_rx.offset(WR_INDEX))?;
        let remote_rx_rd = self.remote(remote_rx.offset(RD_INDEX))?;
        let remote_rx_buffer = self.remote(remote_rx.offset(BUFFER))?;
        let remote_rx_size = self.remote(remote_rx.offset(SIZE))?;
        let remote_tx_rd = self.remote(remote_tx.offset(RD_INDEX))?;

        let tx = self.memory().tx(from);
        let rx = self.memory().rx(from);

        tx.peer_index
            .store(remote_rx.offset(WR_INDEX).0, Ordering::Relaxed);
        remote_rx_wr.store(tx.wr_index.load(Ordering::Relaxed), Ordering::Release);
        tx.rd_index
            .store(remote_rx_rd.load(Ordering::Acquire), Ordering::Release);
        let buffer = mmap(Address(remote_rx_buffer.load(Ordering::Acquire)), from, me);
        tx.buffer.store(buffer.0, Ordering::Relaxed);
        tx.size
            .store(remote_rx_size.load(Ordering::Acquire), Ordering::Release);

        rx.peer_index
            .store(remote_tx.offset(RD_INDEX).0, Ordering::Relaxed);
        remote_tx_rd.store(rx.rd_index.load(Ordering::Relaxed), Ordering::Release);
        self.port
            .shared()
            .row(me)
            .set_linked_generation(me, from, generation);
        self.port.fence();

        self.links[from.index()].set(Link {
            state: LinkState::Active,
            generation,
        });
        if config::CONFIG.trace_ipc {
            log::trace!("[{:?}] linked with {:?}, generation {}", me, from, generation);
        }
        Ok(())
    }

    /// Tear down our side of the link with `peer`.
    fn drop_link(&self, peer: CoreId) {
        let me = self.core_id();
        self.port
            .shared()
            .row(me)
            .publish(me, peer, Address::NULL, Address::NULL);
        self.memory().clear_queues(peer);
        self.port.fence();
        self.event_mask[peer.index()].set(self.port.shared().row(peer).event_mask());
        self.links[peer.index()].set(Link {
            state: LinkState::Terminated,
            ..self.links[peer.index()].get()
        });
        if config::CONFIG.trace_ipc {
            log::trace!("[{:?}] link with {:?} terminated", me, peer);
        }
    }

    /// Set up the link with `peer`, republishing our side if it was torn
    /// down.
    fn attach(&self, peer: CoreId) -> Result<(), ErrorCode> {
        let republish = !self.memory().rx(peer).is_initialized();
        if republish {
            self.reset_local(peer);
            self.publish(peer);
            self.port.fence();
        }
        self.pull(peer)?;
        if republish {
            // The peer pulled our row while it was empty; tell it to look
            // again.
            self.event_send(peer, mailbox::manage_event(self.core_id()))?;
        }
        Ok(())
    }

    /// Handle the management event of `from`.
    fn manage(&self, from: CoreId) -> Result<(), ErrorCode> {
        let me = self.core_id();
        let row = self.port.shared().row(from);
        let link = self.links[from.index()].get();

        if row.link(me).read_descr().is_null() {
            match link.state {
                LinkState::Active => self.drop_link(from),
                // Never linked from our side, but `from` may have pulled us
                // and sent before going away. Its next init starts from
                // empty indices.
                LinkState::Uninitialized => {
                    self.memory().rewind_rx(from);
                    self.port.fence();
                    self.event_mask[from.index()].set(row.event_mask());
                }
                LinkState::Terminated => {
                    self.event_mask[from.index()].set(row.event_mask());
                }
            }
            return Ok(());
        }

        match link.state {
            // Descriptors and indices are already linked. Only the mask can
            // have changed, and re-reading the indices here could roll back
            // a mirror the peer has since advanced.
            LinkState::Active if link.generation == row.generation() => {
                self.event_mask[from.index()].set(row.event_mask());
                Ok(())
            }
            LinkState::Active => {
                log::warn!(
                    "[{:?}] {:?} restarted without terminating, rebuilding link",
                    me,
                    from
                );
                self.drop_link(from);
                self.attach(from)
            }
            LinkState::Uninitialized | LinkState::Terminated => self.attach(from),
        }
    }

    /// Enqueue `message` for `to` and raise our data event on it.
    pub fn send(&self, to: CoreId, message: u32) -> Result<(), ErrorCode> {
        let me = self.core_id();
        let tx = self.memory().tx(to);
        let size = tx.size();
        if size == 0 {
            return Err(ErrorCode::OUTOFRANGE);
        }
        let wr = tx.wr_index.load(Ordering::Relaxed);
        let rd = tx.rd_index.load(Ordering::Acquire);
        if queue::is_full(wr, rd, size) {
            return Err(ErrorCode::INVAL);
        }

        let slot = Address(tx.buffer.load(Ordering::Relaxed)).offset(wr * 4);
        self.remote(slot)?.store(message, Ordering::Relaxed);
        self.port.fence();

        let next = queue::advance(wr, size);
        tx.wr_index.store(next, Ordering::Relaxed);
        self.remote(Address(tx.peer_index.load(Ordering::Relaxed)))?
            .store(next, Ordering::Release);
        self.port.fence();

        if config::CONFIG.trace_ipc {
            log::trace!("[{:?}] sent {:#x} to {:?}", me, message, to);
        }
        self.event_send(to, mailbox::data_event(me))?;
        Ok(())
    }

    /// Dequeue the oldest message from `from`.
    pub fn receive(&self, from: CoreId) -> Result<u32, ErrorCode> {
        let rx = self.memory().rx(from);
        let size = rx.size();
        let message = self.front(from)?;
        let next = queue::advance(rx.rd_index.load(Ordering::Relaxed), size);
        rx.rd_index.store(next, Ordering::Relaxed);
        // Until `from` has been pulled there is no mirror to update; the
        // index is written across when the link is set up.
        if let Some(peer) = self.port.word(Address(rx.peer_index.load(Ordering::Relaxed))) {
            peer.store(next, Ordering::Release);
        }
        self.port.fence();

        if config::CONFIG.trace_ipc {
            log::trace!("[{:?}] received {:#x} from {:?}", self.core_id(), message, from);
        }
        Ok(message)
    }

    /// The oldest message from `from`, left in the queue.
    pub fn peek(&self, from: CoreId) -> Result<u32, ErrorCode> {
        self.front(from)
    }

    fn front(&self, from: CoreId) -> Result<u32, ErrorCode> {
        let rx = self.memory().rx(from);
        if !rx.is_initialized() {
            return Err(ErrorCode::OUTOFRANGE);
        }
        let rd = rx.rd_index.load(Ordering::Relaxed);
        let wr = rx.wr_index.load(Ordering::Acquire);
        if queue::is_empty(wr, rd) {
            return Err(ErrorCode::INVAL);
        }
        let slot = Address(rx.buffer.load(Ordering::Relaxed)).offset(rd * 4);
        Ok(self.remote(slot)?.load(Ordering::Relaxed))
    }

    /// Capacity and occupancy of the queue from `from` to `to`, read from the
    /// descriptors `from` published.
    pub fn queue_state(&self, from: CoreId, to: CoreId) -> Result<QueueState, ErrorCode> {
        let me = self.core_id();
        let descr = self.port.shared().row(from).link(to).write_descr();
        if descr.is_null() {
            return Err(ErrorCode::NOTINIT);
        }
        let descr = mmap(descr, from, me);
        let wr = self.remote(descr.offset(WR_INDEX))?.load(Ordering::Acquire);
        let rd = self.remote(descr.offset(RD_INDEX))?.load(Ordering::Acquire);
        let size = self.remote(descr.offset(SIZE))?.load(Ordering::Acquire);
        if size == 0 {
            return Err(ErrorCode::NOTINIT);
        }
        Ok(QueueState {
            max_size: size,
            num_entries: queue::used(wr, rd, size),
        })
    }

    /// Whether there is nothing to receive from `from`.
    pub fn is_empty(&self, from: CoreId) -> bool {
        let rx = self.memory().rx(from);
        queue::is_empty(
            rx.wr_index.load(Ordering::Acquire),
            rx.rd_index.load(Ordering::Relaxed),
        )
    }

    /// Whether a send to `to` would fail for lack of space.
    pub fn is_full(&self, to: CoreId) -> bool {
        let tx = self.memory().tx(to);
        queue::is_full(
            tx.wr_index.load(Ordering::Relaxed),
            tx.rd_index.load(Ordering::Acquire),
            tx.size(),
        )
    }

    /// Call `client` with `context` when `event` is raised on this core, and
    /// tell the peers our mask changed.
    pub fn register_handler(
        &self,
        event: u32,
        client: &'a dyn EventClient,
        context: usize,
    ) -> Result<(), ErrorCode> {
        if event >= MAX_EVENTS {
            return Err(ErrorCode::INVAL);
        }
        self.handlers[event as usize].set(Some(Handler::Client(client, context)));
        let me = self.core_id();
        self.set_own_mask(self.event_mask(me) | (1 << event));
        self.announce()
    }

    /// Raise `event` on `to`, unless `to` has no handler for it.
    pub fn event_send(&self, to: CoreId, event: u32) -> Result<Delivery, ErrorCode> {
        let (bank, value) = mailbox::encode(event, MailboxOp::Set).ok_or(ErrorCode::INVAL)?;
        if self.event_mask(to) & (1 << event) == 0 {
            if config::CONFIG.trace_ipc {
                log::trace!("[{:?}] event {} masked on {:?}", self.core_id(), event, to);
            }
            return Ok(Delivery::Masked);
        }
        self.port.fence();
        self.port.mailbox_write(to, bank, value);
        Ok(Delivery::Raised)
    }

    /// Pending events on this core, restricted to `mask`.
    pub fn status_get(&self, mask: u32) -> u32 {
        self.port.mailbox_status(self.core_id()) & mask
    }

    /// Acknowledge the events in `mask` on this core.
    pub fn clear(&self, mask: u32) {
        let [a, b] = mailbox::encode_mask(mask, MailboxOp::Clear);
        let me = self.core_id();
        if a != 0 {
            self.port.mailbox_write(me, mailbox::Bank::A, a);
        }
        if b != 0 {
            self.port.mailbox_write(me, mailbox::Bank::B, b);
        }
    }

    /// Run the handlers of the events in `pending`, highest event first.
    pub fn service(&self, pending: u32) {
        let me = self.core_id();
        let mut pending = pending;
        while pending != 0 {
            let event = 31 - pending.leading_zeros();
            pending &= !(1 << event);

            match self.handlers[event as usize].get() {
                Some(Handler::Manage(core)) => {
                    if let Err(e) = self.manage(core) {
                        log::warn!("[{:?}] management event from {:?} failed: {:?}", me, core, e);
                    }
                }
                Some(Handler::Data(core)) => {
                    if let Some((client, context)) = self.queue_client.get() {
                        client.message_received(core, context);
                    }
                }
                Some(Handler::Client(client, context)) => client.event(event, context),
                None => log::warn!("[{:?}] no handler for event {}", me, event),
            }
        }
    }

    /// Mailbox interrupt handler.
    pub fn handle_interrupt(&self) {
        let pending = self.status_get(u32::MAX);
        self.clear(pending);
        self.service(pending);
    }
}
