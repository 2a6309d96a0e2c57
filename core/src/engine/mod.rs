// Copyright (c) 2022-2023 The MobileCoin Foundation

//! The [Engine] provides signing functionality required by hardware wallets.
//!
//! This handles request APDUs via [Engine::handle_apdu] (or pre-parsed [Event]
//! inputs via [Engine::update]) and returns [Output] responses to the caller,
//! see [apdu][crate::apdu] for APDU protocol / encoding specifications.
//!
//! Operations requiring operator approval suspend the engine with an
//! [Output::Pending] response, the platform then displays the [Pending]
//! prompt and resumes the engine via exactly one of [Engine::confirm] or
//! [Engine::reject].

use heapless::Vec;
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

use crate::apdu::{
    baking::MAX_PUBLIC_KEY_SIZE,
    packet::{PacketControl, PacketKind},
    path::KeyPath,
    Instruction, TZ_APDU_CLA,
};

mod error;
pub use error::Error;

mod event;
pub use event::Event;

mod output;
pub use output::Output;

pub mod auth;
use auth::{BakingAuth, Nvram};

pub mod hasher;

pub mod operation;
use operation::{OperationTag, ParsedOperationGroup};

pub mod prompt;
pub use prompt::{Prompt, PromptKind};

mod session;
pub use session::{SigningSession, MAX_PACKETS, MESSAGE_SIZE};

mod baking;
mod sign;
mod wallet;

/// Engine operating mode
#[derive(Copy, Clone, PartialEq, Eq, Debug, EnumString, Display, EnumVariantNames, EnumIter)]
pub enum Mode {
    /// General purpose wallet, operations confirmed by the operator
    Wallet,
    /// Baking, blocks and endorsements signed subject to the high-water mark
    Baking,
}

/// Engine configuration
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Config {
    pub mode: Mode,
    /// Confirm public key requests with the operator
    pub prompt_public_key: bool,
}

impl Config {
    pub const fn wallet() -> Self {
        Self {
            mode: Mode::Wallet,
            prompt_public_key: true,
        }
    }

    pub const fn baking() -> Self {
        Self {
            mode: Mode::Baking,
            prompt_public_key: true,
        }
    }

    /// Return public keys without operator confirmation
    pub const fn without_public_key_prompt(self) -> Self {
        Self {
            prompt_public_key: false,
            ..self
        }
    }
}

/// Engine internal state enumeration
#[derive(Copy, Clone, PartialEq, Debug, EnumString, Display, EnumVariantNames, EnumIter)]
pub enum State {
    /// Idle, no session in progress
    Idle,
    /// Receiving operation packets
    Receiving(u8),
    /// Awaiting operator confirmation
    Pending,
    /// Operation complete
    Complete,
    /// Operation rejected by the operator
    Rejected,
    /// Operation failed
    Error,
}

/// Signature metadata returned by [Driver::sign]
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Signed {
    /// Signature length
    pub len: usize,
    /// ECDSA recovery parity
    pub parity_odd: bool,
}

/// [`Driver`] trait provides platform support for [`Engine`] instances
pub trait Driver {
    /// Sign `message` with the provided key, writing the signature to `out`
    fn sign(&self, key: &KeyPath, message: &[u8], out: &mut [u8]) -> Result<Signed, Error>;

    /// Write the public key for the provided key to `out`, returning the key length
    fn public_key(&self, key: &KeyPath, out: &mut [u8]) -> Result<usize, Error>;

    /// Parse an operation group, rejecting operations with tags outside the allow-list.
    ///
    /// Returns `None` for malformed or disallowed operations.
    fn parse_operations(
        &self,
        buff: &[u8],
        key: &KeyPath,
        allowed: fn(OperationTag) -> bool,
    ) -> Option<ParsedOperationGroup>;
}

impl<T: Driver> Driver for &mut T {
    fn sign(&self, key: &KeyPath, message: &[u8], out: &mut [u8]) -> Result<Signed, Error> {
        T::sign(self, key, message, out)
    }

    fn public_key(&self, key: &KeyPath, out: &mut [u8]) -> Result<usize, Error> {
        T::public_key(self, key, out)
    }

    fn parse_operations(
        &self,
        buff: &[u8],
        key: &KeyPath,
        allowed: fn(OperationTag) -> bool,
    ) -> Option<ParsedOperationGroup> {
        T::parse_operations(self, buff, key, allowed)
    }
}

/// Action executed on confirmation
#[derive(Debug)]
enum Action {
    /// Sign the completed session
    Sign(SigningSession),
    /// Return a public key
    PublicKey(Vec<u8, MAX_PUBLIC_KEY_SIZE>),
    /// Authorize a baking key
    Authorize {
        key: KeyPath,
        public_key: Vec<u8, MAX_PUBLIC_KEY_SIZE>,
    },
    /// Reset the high-water mark
    Reset(u32),
}

/// Operation awaiting operator confirmation
#[derive(Debug)]
pub struct Pending {
    prompt: Prompt,
    action: Action,
}

impl Pending {
    fn sign(prompt: Prompt, session: SigningSession) -> Self {
        Self {
            prompt,
            action: Action::Sign(session),
        }
    }

    /// Fetch the confirmation prompt
    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    /// Fetch the raw message for unhashed signing requests
    pub fn message(&self) -> Option<&[u8]> {
        match &self.action {
            Action::Sign(s) if !s.is_hashing() => Some(s.message()),
            _ => None,
        }
    }
}

/// Confirmation state machine
#[derive(Debug, Default)]
pub enum Confirmation {
    #[default]
    Idle,
    AwaitingConfirmation(Pending),
}

/// Result of completing a signing session
enum Completion {
    /// Signed without operator interaction
    Signed(Output),
    /// Awaiting confirmation
    Confirm(Pending),
}

/// [Engine] provides hardware-independent support for Tezos signing operations
pub struct Engine<DRV: Driver, NVM: Nvram> {
    config: Config,
    state: State,

    session: Option<SigningSession>,
    confirmation: Confirmation,

    auth: BakingAuth<NVM>,
    drv: DRV,
}

impl<DRV: Driver, NVM: Nvram> Engine<DRV, NVM> {
    /// Create a new engine instance with the provided configuration, driver and storage
    pub const fn new(config: Config, drv: DRV, nvm: NVM) -> Self {
        Self {
            config,
            state: State::Idle,
            session: None,
            confirmation: Confirmation::Idle,
            auth: BakingAuth::new(nvm),
            drv,
        }
    }

    /// Handle an incoming request APDU (class, instruction, `P1` and payload).
    ///
    /// Any error, including malformed requests, aborts the session in progress
    /// and discards any pending confirmation.
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn handle_apdu(&mut self, cla: u8, ins: u8, p1: u8, buff: &[u8]) -> Result<Output, Error> {
        let evt = match cla {
            TZ_APDU_CLA => Event::parse(ins, p1, buff),
            _ => Err(Error::InvalidClass),
        };

        match evt {
            Ok(evt) => self.update(&evt),
            Err(e) => {
                #[cfg(feature = "log")]
                log::warn!("request decode failed (ins: 0x{:02x}): {:?}", ins, e);

                self.abort();
                Err(e)
            }
        }
    }

    /// Handle pre-parsed events.
    ///
    /// Any error aborts the session in progress and discards any pending confirmation.
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn update(&mut self, evt: &Event) -> Result<Output, Error> {
        let r = self.handle(evt);

        if let Err(e) = &r {
            #[cfg(feature = "log")]
            log::warn!("{} failed: {:?}", evt.name(), e);

            self.abort();
        }

        r
    }

    fn handle(&mut self, evt: &Event) -> Result<Output, Error> {
        #[cfg(feature = "log")]
        log::debug!("event: {} (state: {})", evt.name(), self.state);

        // Check instruction availability for the configured mode
        if !evt.is_available(self.config.mode) {
            return Err(Error::InvalidInstruction);
        }

        match evt {
            Event::None => Ok(Output::None),

            Event::SignFirst { ins, key, control } => self.sign_first(*ins, key, *control),

            Event::SignNext { ins, control, data } => self.sign_next(*ins, *control, data),

            Event::GetPublicKey { key } => {
                self.discard();

                let public_key = self.public_key(key)?;

                if !self.config.prompt_public_key {
                    self.state = State::Complete;
                    return Ok(Output::PublicKey(public_key));
                }

                Ok(self.suspend(Pending {
                    prompt: Prompt::provide_public_key(&public_key),
                    action: Action::PublicKey(public_key),
                }))
            }

            Event::AuthorizeBaking { key } => {
                self.discard();

                let public_key = self.public_key(key)?;

                Ok(self.suspend(Pending {
                    prompt: Prompt::authorize_baking(&public_key),
                    action: Action::Authorize {
                        key: key.clone(),
                        public_key,
                    },
                }))
            }

            Event::ResetHighWaterMark { level } => {
                self.discard();

                if !operation::is_valid_level(*level) {
                    return Err(Error::WrongParameter);
                }

                Ok(self.suspend(Pending {
                    prompt: Prompt::reset(*level),
                    action: Action::Reset(*level),
                }))
            }

            Event::QueryAuthKey => Ok(Output::AuthKey(self.auth.data().key)),

            Event::QueryHighWaterMark => {
                let d = self.auth.data();
                Ok(Output::HighWaterMark {
                    level: d.highest_level,
                    had_endorsement: d.had_endorsement,
                })
            }
        }
    }

    /// Fetch the public key for the provided path from the driver
    fn public_key(&self, key: &KeyPath) -> Result<Vec<u8, MAX_PUBLIC_KEY_SIZE>, Error> {
        let mut pk = [0u8; MAX_PUBLIC_KEY_SIZE];
        let n = self.drv.public_key(key, &mut pk)?;

        pk.get(..n)
            .and_then(|p| Vec::from_slice(p).ok())
            .ok_or(Error::MemoryError)
    }

    /// Start a new signing session, discarding any session in progress
    fn sign_first(
        &mut self,
        ins: Instruction,
        key: &KeyPath,
        control: PacketControl,
    ) -> Result<Output, Error> {
        self.discard();

        // FIRST packets carry no operation data so cannot complete a message
        if control.last {
            return Err(Error::WrongParameter);
        }

        #[cfg(feature = "log")]
        log::debug!("start {:?} session for {}", ins, key);

        self.session = Some(SigningSession::start(ins, key.clone())?);
        self.state = State::Receiving(0);

        Ok(Output::None)
    }

    /// Append operation data to the session in progress
    #[cfg_attr(feature = "noinline", inline(never))]
    fn sign_next(
        &mut self,
        ins: Instruction,
        control: PacketControl,
        data: &[u8],
    ) -> Result<Output, Error> {
        let mode = self.config.mode;

        if control.kind == PacketKind::HashOnlyNext && mode != Mode::Wallet {
            return Err(Error::WrongParameter);
        }

        let session = match self.session.as_mut() {
            Some(s) if s.instruction() == ins => s,
            _ => return Err(Error::ParseError),
        };

        let index = session.next_packet(control.kind)?;

        if session.is_hashing() {
            match mode {
                Mode::Wallet => wallet::classify(session, index, data, &self.drv)?,
                Mode::Baking => baking::classify(session, index, data, &self.drv)?,
            }
        }

        session.append(data)?;

        if !control.last {
            self.state = State::Receiving(index);
            return Ok(Output::None);
        }

        let mut session = self.session.take().ok_or(Error::InvalidState)?;
        session.finish();

        #[cfg(feature = "log")]
        log::debug!("session complete ({} packets)", index);

        let c = match mode {
            Mode::Wallet => wallet::complete(session)?,
            Mode::Baking => baking::complete(session, &mut self.auth, &self.drv)?,
        };

        match c {
            Completion::Signed(o) => {
                self.state = State::Complete;
                Ok(o)
            }
            Completion::Confirm(p) => Ok(self.suspend(p)),
        }
    }

    fn suspend(&mut self, p: Pending) -> Output {
        #[cfg(feature = "log")]
        log::debug!("awaiting confirmation: {}", p.prompt.kind());

        self.confirmation = Confirmation::AwaitingConfirmation(p);
        self.state = State::Pending;

        Output::Pending
    }

    /// Confirm the pending operation, returning the operation output
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn confirm(&mut self) -> Result<Output, Error> {
        let p = match core::mem::take(&mut self.confirmation) {
            Confirmation::AwaitingConfirmation(p) => p,
            Confirmation::Idle => {
                self.abort();
                return Err(Error::InvalidState);
            }
        };

        #[cfg(feature = "log")]
        log::debug!("confirmed: {}", p.prompt.kind());

        let r = match p.action {
            Action::Sign(session) => sign::finalize(session, &self.drv),
            Action::PublicKey(public_key) => Ok(Output::PublicKey(public_key)),
            Action::Authorize { key, public_key } => self
                .auth
                .authorize(&key)
                .map(|_| Output::PublicKey(public_key)),
            Action::Reset(level) => self.auth.reset(level).map(|_| Output::None),
        };

        match r {
            Ok(o) => {
                self.state = State::Complete;
                Ok(o)
            }
            Err(e) => {
                #[cfg(feature = "log")]
                log::error!("confirmed operation failed: {:?}", e);

                self.abort();
                Err(e)
            }
        }
    }

    /// Reject the pending operation, destroying the associated session
    pub fn reject(&mut self) -> Result<Output, Error> {
        match core::mem::take(&mut self.confirmation) {
            Confirmation::AwaitingConfirmation(_p) => {
                #[cfg(feature = "log")]
                log::debug!("rejected: {}", _p.prompt.kind());

                self.state = State::Rejected;
                Ok(Output::Rejected)
            }
            Confirmation::Idle => {
                self.abort();
                Err(Error::InvalidState)
            }
        }
    }

    /// Fetch current engine state
    pub fn state(&self) -> State {
        self.state
    }

    /// Fetch engine configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch the operation awaiting confirmation, if any
    pub fn pending(&self) -> Option<&Pending> {
        match &self.confirmation {
            Confirmation::AwaitingConfirmation(p) => Some(p),
            Confirmation::Idle => None,
        }
    }

    /// Fetch the baking authorization guard
    pub fn auth(&self) -> &BakingAuth<NVM> {
        &self.auth
    }

    /// Reset engine state, discarding any session or pending confirmation
    pub fn reset(&mut self) {
        self.discard();
        self.state = State::Idle;
    }

    /// Drop session and confirmation state (sessions are zeroized on drop)
    fn discard(&mut self) {
        self.session = None;
        self.confirmation = Confirmation::Idle;
    }

    fn abort(&mut self) {
        self.discard();
        self.state = State::Error;
    }
}
