//! Device state machine: Fresh -> PairingMode -> Paired ->
//! (Locked), plus dispatch of every encrypted operation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature as P256Signature, VerifyingKey as P256VerifyingKey};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tokio::sync::oneshot;

use crate::approval::{ApprovalSink, Decision, SigningRequest};
use crate::codec::{self, SecretCache, Session};
use crate::constants::{
    AddressFlag, Curve, Encoding, HashType, RequestType, ResponseCode, Schema, FW_MIN_BLS, FW_MIN_KV,
    MSG_TYPE_CONNECT, MSG_TYPE_ENCRYPTED, PAIRING_TIMEOUT_MS_DEFAULT, APPROVAL_TIMEOUT_MS_DEFAULT,
};
use crate::error::Error;
use crate::events::{Event, EventSink};
use crate::kv::{InMemoryKvStore, KvRecord, KvStore};
use crate::requests;
use crate::responses;
use crate::signing::{MultipartSession, SigningEngine};
use crate::types::{DerivationPath, ExtraDataFrame, SignBody, WalletDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Fresh,
    PairingMode,
    Paired,
    Locked,
}

/// Construction-time configuration surface.
pub struct DeviceConfig {
    pub auto_approve: bool,
    pub firmware_version: (u8, u8, u8),
    pub device_id: Option<[u8; 32]>,
    pub pairing_code: String,
    pub pairing_timeout_ms: u64,
    pub approval_timeout_ms: u64,
    pub seed: [u8; 64],
}

impl DeviceConfig {
    pub fn new(seed: [u8; 64]) -> Self {
        Self {
            auto_approve: false,
            firmware_version: (0, 15, 0),
            device_id: None,
            pairing_code: crate::constants::PAIRING_CODE_DEFAULT.to_string(),
            pairing_timeout_ms: PAIRING_TIMEOUT_MS_DEFAULT,
            approval_timeout_ms: APPROVAL_TIMEOUT_MS_DEFAULT,
            seed,
        }
    }

    pub fn auto_approve(mut self, value: bool) -> Self {
        self.auto_approve = value;
        self
    }

    pub fn firmware_version(mut self, version: (u8, u8, u8)) -> Self {
        self.firmware_version = version;
        self
    }

    pub fn pairing_code(mut self, code: impl Into<String>) -> Self {
        self.pairing_code = code.into();
        self
    }
}

struct Inner {
    state: LifecycleState,
    session: Option<Session>,
    secret_cache: SecretCache,
    multipart_sessions: HashMap<[u8; 8], MultipartSession>,
    pending_approvals: HashMap<u64, oneshot::Sender<Decision>>,
    next_request_id: u64,
    pairing_deadline: Option<Instant>,
    firmware_version: (u8, u8, u8),
    device_id: [u8; 32],
    pairing_code: String,
    internal_wallet: WalletDescriptor,
    external_wallet: WalletDescriptor,
}

pub struct Device {
    inner: Mutex<Inner>,
    config_auto_approve: bool,
    pairing_timeout_ms: u64,
    approval_timeout_ms: u64,
    seed: [u8; 64],
    kv_store: Mutex<Box<dyn KvStore>>,
    approval_sink: Box<dyn ApprovalSink>,
    event_sink: Box<dyn EventSink>,
}

impl Device {
    pub fn new(
        config: DeviceConfig,
        kv_store: Box<dyn KvStore>,
        approval_sink: Box<dyn ApprovalSink>,
        event_sink: Box<dyn EventSink>,
    ) -> Self {
        let device_id = config.device_id.unwrap_or_else(|| {
            let mut id = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut id);
            id
        });
        let internal_wallet = WalletDescriptor::new([0u8; 32], 0, "internal", false);
        let external_wallet = WalletDescriptor::new([0u8; 32], 0, "external", true);
        Self {
            inner: Mutex::new(Inner {
                state: LifecycleState::Fresh,
                session: None,
                secret_cache: SecretCache::new(),
                multipart_sessions: HashMap::new(),
                pending_approvals: HashMap::new(),
                next_request_id: 0,
                pairing_deadline: None,
                firmware_version: config.firmware_version,
                device_id,
                pairing_code: config.pairing_code.clone(),
                internal_wallet,
                external_wallet,
            }),
            config_auto_approve: config.auto_approve,
            pairing_timeout_ms: config.pairing_timeout_ms,
            approval_timeout_ms: config.approval_timeout_ms,
            seed: config.seed,
            kv_store: Mutex::new(kv_store),
            approval_sink,
            event_sink,
        }
    }

    pub fn with_defaults(seed: [u8; 64]) -> Self {
        Self::new(
            DeviceConfig::new(seed),
            Box::new(InMemoryKvStore::new()),
            Box::new(crate::approval::AutoApprove),
            Box::new(crate::events::NullEventSink),
        )
    }

    fn expire_pairing_mode_if_needed(&self, inner: &mut Inner) {
        if inner.state == LifecycleState::PairingMode {
            if let Some(deadline) = inner.pairing_deadline {
                if Instant::now() >= deadline {
                    inner.state = LifecycleState::Fresh;
                    inner.pairing_deadline = None;
                    inner.session = None;
                    self.event_sink.emit(Event::PairingModeEnded);
                }
            }
        }
    }

    /// `Connect`: legal in any non-Locked state.
    pub fn connect(&self, client_pub: [u8; 65]) -> Result<Vec<u8>, Error> {
        let mut inner = self.inner.lock().unwrap();
        self.expire_pairing_mode_if_needed(&mut inner);
        if inner.state == LifecycleState::Locked {
            return Err(Error::DeviceLocked);
        }

        let mut session = Session::new();
        session.connect(client_pub)?;
        let ephemeral_pub = session.ephemeral_public();
        let shared_secret = session.shared_secret;
        inner.session = Some(session);

        let is_paired = inner.state == LifecycleState::Paired;
        if !is_paired {
            inner.state = LifecycleState::PairingMode;
            inner.pairing_deadline = Some(Instant::now() + Duration::from_millis(self.pairing_timeout_ms));
            self.event_sink.emit(Event::PairingModeStarted);
        }
        self.event_sink.emit(Event::ConnectionChanged { paired: is_paired });

        let wallets = if is_paired {
            Some((&inner.internal_wallet, &inner.external_wallet))
        } else {
            None
        };
        let firmware_version = inner.firmware_version;
        let response = responses::connect::serialize(
            is_paired,
            &ephemeral_pub,
            firmware_version,
            wallets,
            shared_secret.as_ref(),
        );
        drop(inner);

        // The connect response itself rides the same encrypted-frame codec
        // as every other response; its leading status byte is dropped here
        // since the outer framing's response_code already carries it.
        let secret = shared_secret.ok_or(Error::PairFailed)?;
        Ok(codec::outbound_encrypt(&ephemeral_pub, &response[1..], response.len() - 1, &secret))
    }

    /// `FinalizePairing`: legal only in `PairingMode`.
    pub fn finalize_pairing(&self, body: &[u8]) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        self.expire_pairing_mode_if_needed(&mut inner);
        if inner.state != LifecycleState::PairingMode {
            return Err(Error::PairFailed);
        }
        let request = requests::finalize_pairing::parse(body)?;

        let session = inner.session.as_ref().ok_or(Error::PairFailed)?;
        let client_pub = session.client_pub.ok_or(Error::PairFailed)?;

        let mut preimage = Vec::with_capacity(65 + 25 + inner.pairing_code.len());
        preimage.extend_from_slice(&client_pub);
        preimage.extend_from_slice(&request.app_name);
        preimage.extend_from_slice(inner.pairing_code.as_bytes());
        let digest = Sha256::digest(&preimage);

        let verified = verify_p256_der(&client_pub, &digest, &request.signature_der);
        if !verified {
            return Err(Error::PairFailed);
        }

        inner.state = LifecycleState::Paired;
        inner.pairing_deadline = None;
        self.event_sink.emit(Event::PairingModeEnded);
        self.event_sink.emit(Event::PairingChanged { paired: true });
        Ok(())
    }

    fn require_operational(&self, inner: &mut Inner) -> Result<(), Error> {
        self.expire_pairing_mode_if_needed(inner);
        match inner.state {
            LifecycleState::Paired => Ok(()),
            LifecycleState::Locked => Err(Error::DeviceLocked),
            _ => Err(Error::PairFailed),
        }
    }

    /// `Reset`: hard-transitions to `Fresh`.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = LifecycleState::Fresh;
        inner.session = None;
        inner.secret_cache.clear();
        inner.multipart_sessions.clear();
        inner.pending_approvals.clear();
        inner.pairing_deadline = None;
        inner.pairing_code = crate::constants::PAIRING_CODE_DEFAULT.to_string();
    }

    pub fn get_wallets(&self) -> Result<Vec<u8>, Error> {
        let mut inner = self.inner.lock().unwrap();
        self.require_operational(&mut inner)?;
        Ok(responses::get_wallets::serialize(&inner.internal_wallet, &inner.external_wallet))
    }

    pub fn get_addresses(&self, body: &[u8]) -> Result<Vec<u8>, Error> {
        let mut inner = self.inner.lock().unwrap();
        self.require_operational(&mut inner)?;
        let request = requests::get_addresses::parse(body)?;
        let flag = AddressFlag::from_u8(request.flag).ok_or(Error::InvalidMsg)?;

        let mut slots = Vec::with_capacity(request.count as usize);
        for i in 0..request.count as u32 {
            let mut path = request.path;
            if path.depth > 0 {
                let last = path.depth as usize - 1;
                path.segments[last] = path.segments[last].wrapping_add(request.iter_idx as u32 + i);
            }
            slots.push(self.derive_address_slot(&path, flag)?);
        }
        Ok(responses::get_addresses::serialize(flag, &slots))
    }

    fn derive_address_slot(
        &self,
        path: &DerivationPath,
        flag: AddressFlag,
    ) -> Result<responses::get_addresses::AddressSlot, Error> {
        use responses::get_addresses::AddressSlot;
        match flag {
            AddressFlag::Address => {
                let key = crate::hd::bip32_derive::derive_secp256k1(&self.seed, path)?;
                let pubkey = crate::curves::secp256k1::public_key_uncompressed(&key);
                let addr = crate::addr::ethereum_address_bytes(&pubkey);
                Ok(AddressSlot::Ascii(crate::addr::ethereum_address_lowercase(&addr)))
            }
            AddressFlag::Secp256k1Pubkey => {
                let key = crate::hd::bip32_derive::derive_secp256k1(&self.seed, path)?;
                Ok(AddressSlot::Secp256k1Pubkey(crate::curves::secp256k1::public_key_uncompressed(&key)))
            }
            AddressFlag::Ed25519Pubkey => {
                let key = crate::hd::slip10::derive_ed25519(&self.seed, path)?;
                Ok(AddressSlot::Ed25519Pubkey(crate::curves::ed25519::public_key_bytes(&key)))
            }
            AddressFlag::Bls12_381Pubkey => {
                let scalar = crate::hd::eip2333::derive_bls(&self.seed, path)?;
                let sk = crate::curves::bls::secret_key_from_scalar(&scalar)?;
                Ok(AddressSlot::Bls12_381Pubkey(crate::curves::bls::public_key_compressed(&sk)))
            }
            AddressFlag::Secp256k1Xpub => {
                let key = crate::hd::bip32_derive::derive_secp256k1(&self.seed, path)?;
                Ok(AddressSlot::Secp256k1Pubkey(crate::curves::secp256k1::public_key_uncompressed(&key)))
            }
        }
    }

    pub fn get_kv_records(&self, body: &[u8]) -> Result<Vec<u8>, Error> {
        let mut inner = self.inner.lock().unwrap();
        self.require_operational(&mut inner)?;
        self.check_firmware(&inner, FW_MIN_KV)?;
        let request = requests::kv_records::parse_get(body)?;
        let store = self.kv_store.lock().unwrap();
        let (records, total, _fetched) = store.list(request.kind, request.n, request.start)?;
        Ok(responses::kv_records::serialize(total, &records))
    }

    pub fn add_kv_records(&self, body: &[u8]) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        self.require_operational(&mut inner)?;
        self.check_firmware(&inner, FW_MIN_KV)?;
        let records = requests::kv_records::parse_add(body)?;
        let count = records.len();
        let mut store = self.kv_store.lock().unwrap();
        store.add(records)?;
        self.event_sink.emit(Event::KvRecordsAdded { count });
        Ok(())
    }

    pub fn remove_kv_records(&self, body: &[u8]) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        self.require_operational(&mut inner)?;
        self.check_firmware(&inner, FW_MIN_KV)?;
        let request = requests::kv_records::parse_remove(body)?;
        let mut store = self.kv_store.lock().unwrap();
        store.remove(request.kind, &request.ids)?;
        self.event_sink.emit(Event::KvRecordsRemoved { count: request.ids.len() });
        Ok(())
    }

    fn check_firmware(&self, inner: &Inner, minimum: (u8, u8, u8)) -> Result<(), Error> {
        if inner.firmware_version >= minimum {
            Ok(())
        } else {
            Err(Error::UnsupportedVersion)
        }
    }

    pub fn fetch_encrypted_data(&self, body: &[u8]) -> Result<Vec<u8>, Error> {
        let mut inner = self.inner.lock().unwrap();
        self.require_operational(&mut inner)?;
        let request = requests::fetch_encrypted_data::parse(body)?;
        let _ = (request.schema, request.wallet_uid, request.params);

        let session = inner.session.as_ref().ok_or(Error::PairFailed)?;
        let secret = session.shared_secret.ok_or(Error::PairFailed)?;
        let key = crate::hd::bip32_derive::derive_secp256k1(&self.seed, &request.path)?;
        let plaintext = crate::curves::secp256k1::public_key_uncompressed(&key);
        Ok(crate::codec::outbound_encrypt(&session.ephemeral_public(), &plaintext, 65, &secret))
    }

    pub fn test_job(&self, body: &[u8]) -> Result<Vec<u8>, Error> {
        let mut inner = self.inner.lock().unwrap();
        self.require_operational(&mut inner)?;
        let request = requests::test_job::parse(body)?;
        Ok(request.payload)
    }

    /// Top-level wire entry point: takes the outer message-type-prefixed
    /// bytes straight off the transport, decrypts/dispatches/re-encrypts as
    /// needed, and always returns a fully outer-framed response.
    pub async fn handle_frame(&self, message: &[u8]) -> Vec<u8> {
        crate::frame_response(self.dispatch_frame(message).await)
    }

    async fn dispatch_frame(&self, message: &[u8]) -> Result<Vec<u8>, Error> {
        match message.first() {
            Some(&MSG_TYPE_CONNECT) => {
                let client_pub = requests::connect::parse(&message[1..])?;
                self.connect(client_pub)
            }
            Some(&MSG_TYPE_ENCRYPTED) => self.dispatch_encrypted(&message[1..]).await,
            _ => Err(Error::InvalidMsg),
        }
    }

    /// `request-type(1) | ephemeral_id(u32 BE) | ciphertext`: decrypt
    /// against the cached-by-hint secret or the live session secret,
    /// promote whichever one worked into the cache, dispatch to the
    /// matching parse/handle logic, then re-encrypt the response under a
    /// freshly rotated ephemeral.
    async fn dispatch_encrypted(&self, body: &[u8]) -> Result<Vec<u8>, Error> {
        if body.len() < 5 {
            return Err(Error::InvalidMsg);
        }
        let req_type = RequestType::from_u8(body[0]).ok_or(Error::InvalidMsg)?;
        let ephemeral_id_hint = u32::from_be_bytes(body[1..5].try_into().unwrap());
        let ciphertext = &body[5..];

        let (req_data, secret_used, ephemeral_pub) = {
            let mut inner = self.inner.lock().unwrap();
            self.expire_pairing_mode_if_needed(&mut inner);
            let current_secret = inner.session.as_ref().and_then(|s| s.shared_secret);
            let (req_data, secret_used) = codec::inbound_decrypt(
                req_type,
                ciphertext,
                Some(ephemeral_id_hint),
                &inner.secret_cache,
                current_secret,
            )?;
            inner.secret_cache.insert(secret_used);
            let session = inner.session.as_mut().ok_or(Error::PairFailed)?;
            session.rotate_ephemeral();
            (req_data, secret_used, session.ephemeral_public())
        };

        let plaintext_response = match req_type {
            RequestType::FinalizePairing => {
                self.finalize_pairing(&req_data)?;
                Vec::new()
            }
            RequestType::GetAddresses => self.get_addresses(&req_data)?,
            RequestType::Sign => self.sign(&req_data).await?,
            RequestType::GetWallets => self.get_wallets()?,
            RequestType::GetKvRecords => self.get_kv_records(&req_data)?,
            RequestType::AddKvRecords => {
                self.add_kv_records(&req_data)?;
                Vec::new()
            }
            RequestType::RemoveKvRecords => {
                self.remove_kv_records(&req_data)?;
                Vec::new()
            }
            // Already encrypts its own response blob against the (now
            // rotated) session ephemeral; nothing left to wrap.
            RequestType::FetchEncryptedData => return self.fetch_encrypted_data(&req_data),
            RequestType::Test => self.test_job(&req_data)?,
        };

        Ok(codec::outbound_encrypt(&ephemeral_pub, &plaintext_response, req_type.max_response_len(), &secret_used))
    }

    /// `Sign`: dispatches by schema, manages multipart
    /// sessions, and runs approval suspension for completed requests.
    pub async fn sign(&self, body: &[u8]) -> Result<Vec<u8>, Error> {
        let sign_request = {
            let mut inner = self.inner.lock().unwrap();
            self.require_operational(&mut inner)?;
            requests::sign::parse(body)?
        };

        let has_extra_payloads = sign_request.has_extra_payloads;
        match sign_request.body {
            SignBody::Generic(ref payload) if payload.declared_length == 0 && payload.chunk.is_empty() => {
                Err(Error::InvalidMsg)
            }
            SignBody::ExtraData(frame) => self.handle_extra_data(frame, has_extra_payloads),
            SignBody::EthereumTransaction(ref meta) if sign_request.has_extra_payloads || meta.declared_data_len as usize > meta.chunk.len() && !meta.prehash => {
                self.start_multipart_eth(sign_request.schema, meta.clone())
            }
            SignBody::Generic(ref payload)
                if sign_request.has_extra_payloads || payload.declared_length as usize > payload.chunk.len() =>
            {
                self.start_multipart_generic(payload.clone())
            }
            other => self.execute_sync(sign_request.schema, other).await,
        }
    }

    fn check_bls_firmware(&self, inner: &Inner, curve: Curve) -> Result<(), Error> {
        if curve == Curve::Bls12_381 {
            self.check_firmware(inner, FW_MIN_BLS)
        } else {
            Ok(())
        }
    }

    fn start_multipart_eth(&self, schema: Schema, meta: crate::requests::sign_eth_tx::EthTxSignPayload) -> Result<Vec<u8>, Error> {
        let mut inner = self.inner.lock().unwrap();
        let next_code = crate::signing::generate_next_code();
        let expected_length = meta.declared_data_len as usize;
        let mut session = MultipartSession {
            schema,
            curve: Curve::Secp256k1,
            encoding: Encoding::Evm,
            hash_type: HashType::Keccak256,
            omit_pubkey: false,
            path: meta.path,
            expected_length,
            message_chunks: Vec::new(),
            decoder_suffix_chunks: Vec::new(),
            next_code,
            eth_meta: Some(meta.clone()),
        };
        session.absorb(&meta.chunk);
        inner.multipart_sessions.insert(next_code, session);
        Ok(responses::sign::serialize(&responses::sign::SignResponseBody::MultipartPlaceholder { next_code }))
    }

    fn start_multipart_generic(&self, payload: crate::types::GenericSignPayload) -> Result<Vec<u8>, Error> {
        let mut inner = self.inner.lock().unwrap();
        let next_code = crate::signing::generate_next_code();
        let mut session = MultipartSession {
            schema: Schema::Generic,
            curve: payload.curve,
            encoding: payload.encoding,
            hash_type: payload.hash_type,
            omit_pubkey: payload.omit_pubkey,
            path: payload.path,
            expected_length: payload.declared_length as usize,
            message_chunks: Vec::new(),
            decoder_suffix_chunks: Vec::new(),
            next_code,
            eth_meta: None,
        };
        session.absorb(&payload.chunk);
        inner.multipart_sessions.insert(next_code, session);
        Ok(responses::sign::serialize(&responses::sign::SignResponseBody::MultipartPlaceholder { next_code }))
    }

    fn handle_extra_data(&self, frame: ExtraDataFrame, has_extra_payloads: bool) -> Result<Vec<u8>, Error> {
        let mut inner = self.inner.lock().unwrap();
        let mut session = inner
            .multipart_sessions
            .remove(&frame.next_code)
            .ok_or(Error::InvalidMsg)?;
        session.absorb(&frame.frame);

        if has_extra_payloads {
            let new_code = crate::signing::generate_next_code();
            session.next_code = new_code;
            inner.multipart_sessions.insert(new_code, session);
            return Ok(responses::sign::serialize(
                &responses::sign::SignResponseBody::MultipartPlaceholder { next_code: new_code },
            ));
        }
        drop(inner);

        self.execute_completed_multipart(session)
    }

    fn execute_completed_multipart(&self, session: MultipartSession) -> Result<Vec<u8>, Error> {
        let full_data = session.full_data();
        let engine = SigningEngine::new(&self.seed);

        if let Some(meta) = &session.eth_meta {
            let auth_list_rlp: Vec<u8> = session.decoder_suffix_chunks.iter().flatten().copied().collect();
            let preimage = crate::signing::eth_preimage::build_preimage(meta, &full_data, &auth_list_rlp);
            let response = engine.sign_ethereum_like(&session.path, HashType::Keccak256, &preimage)?;
            return Ok(responses::sign::serialize(&response));
        }

        let response = engine.sign_generic(session.curve, session.hash_type, &session.path, session.omit_pubkey, &full_data)?;
        Ok(responses::sign::serialize(&response))
    }

    async fn execute_sync(&self, schema: Schema, body: SignBody) -> Result<Vec<u8>, Error> {
        if !self.config_auto_approve {
            self.await_approval(schema, &body).await?;
        }

        let engine = SigningEngine::new(&self.seed);
        let response = match body {
            SignBody::Bitcoin(payload) => {
                let input = payload.inputs.first().ok_or(Error::InvalidMsg)?;
                let mut preimage = Vec::with_capacity(32 + 4 + 8);
                preimage.extend_from_slice(&input.prev_txid);
                preimage.extend_from_slice(&input.prev_vout.to_be_bytes());
                preimage.extend_from_slice(&input.value_sats.to_be_bytes());
                let sighash = Sha256::digest(Sha256::digest(&preimage));
                let mut hash32 = [0u8; 32];
                hash32.copy_from_slice(&sighash);
                engine.sign_bitcoin_single_input(&input.signer_path, &payload.change_path, &hash32)?
            }
            SignBody::EthereumTransaction(meta) => {
                let data_len = (meta.declared_data_len as usize).min(meta.chunk.len());
                let (data, auth_list_rlp) = meta.chunk.split_at(data_len);
                let preimage = crate::signing::eth_preimage::build_preimage(&meta, data, auth_list_rlp);
                let hash_type = if meta.prehash { HashType::None } else { HashType::Keccak256 };
                engine.sign_ethereum_like(&meta.path, hash_type, &preimage)?
            }
            SignBody::EthereumMessage(message) => {
                let hash_type = if message.prehash { HashType::None } else { HashType::Keccak256 };
                engine.sign_ethereum_like(&message.path, hash_type, &message.chunk)?
            }
            SignBody::Generic(payload) => {
                engine.sign_generic(payload.curve, payload.hash_type, &payload.path, payload.omit_pubkey, &payload.chunk)?
            }
            SignBody::ExtraData(_) => return Err(Error::InvalidMsg),
        };
        Ok(responses::sign::serialize(&response))
    }

    /// Race the collaborator's `ApprovalSink`, an explicit `approve`/`reject`
    /// call against the pending request's id, and the approval timeout.
    /// Whichever resolves first decides the request.
    async fn await_approval(&self, schema: Schema, body: &SignBody) -> Result<(), Error> {
        let (id, curve, path, data, receiver) = {
            let mut inner = self.inner.lock().unwrap();
            self.check_bls_firmware(&inner, curve_of(body))?;
            let id = inner.next_request_id;
            inner.next_request_id += 1;
            let (tx, rx) = oneshot::channel();
            inner.pending_approvals.insert(id, tx);
            (id, curve_of(body), path_of(body), data_of(body), rx)
        };
        self.event_sink.emit(Event::SigningRequestCreated { id });

        let request = SigningRequest { id, schema, curve, path, data };
        tokio::pin!(receiver);
        let decision = tokio::select! {
            sink_decision = self.approval_sink.on_request(request) => sink_decision,
            explicit = &mut receiver => explicit.unwrap_or_else(|_| Decision::Reject("approval channel dropped".to_string())),
            _ = tokio::time::sleep(Duration::from_millis(self.approval_timeout_ms)) => {
                Decision::Reject("timed out".to_string())
            }
        };

        self.inner.lock().unwrap().pending_approvals.remove(&id);

        let accepted = matches!(decision, Decision::Approve);
        self.event_sink.emit(Event::SigningRequestCompleted { id, accepted });
        if accepted {
            Ok(())
        } else {
            Err(Error::UserDeclined)
        }
    }

    /// Explicitly approve a sign request suspended in `await_approval`,
    /// identified by the id handed out via `Event::SigningRequestCreated`.
    pub fn approve(&self, id: u64) -> Result<(), Error> {
        let sender = self.inner.lock().unwrap().pending_approvals.remove(&id).ok_or(Error::InvalidMsg)?;
        let _ = sender.send(Decision::Approve);
        Ok(())
    }

    /// Explicitly reject a sign request suspended in `await_approval`.
    pub fn reject(&self, id: u64, reason: impl Into<String>) -> Result<(), Error> {
        let sender = self.inner.lock().unwrap().pending_approvals.remove(&id).ok_or(Error::InvalidMsg)?;
        let _ = sender.send(Decision::Reject(reason.into()));
        Ok(())
    }

    pub fn response_code_for(result: &Result<Vec<u8>, Error>) -> ResponseCode {
        match result {
            Ok(_) => ResponseCode::Success,
            Err(e) => e.to_response_code(),
        }
    }

    /// Opaque state export for collaborators that wish to persist across
    /// restarts.
    pub fn export_state(&self) -> Vec<u8> {
        let inner = self.inner.lock().unwrap();
        let mut out = Vec::new();
        out.push((inner.state == LifecycleState::Paired) as u8);
        out.extend_from_slice(&inner.device_id);
        out.push(inner.firmware_version.0);
        out.push(inner.firmware_version.1);
        out.push(inner.firmware_version.2);
        out
    }

    pub fn restore_state(&self, blob: &[u8]) -> Result<(), Error> {
        if blob.len() != 1 + 32 + 3 {
            return Err(Error::InvalidMsg);
        }
        let mut inner = self.inner.lock().unwrap();
        let paired = blob[0] != 0;
        inner.state = if paired { LifecycleState::Paired } else { LifecycleState::Fresh };
        inner.device_id.copy_from_slice(&blob[1..33]);
        inner.firmware_version = (blob[33], blob[34], blob[35]);
        Ok(())
    }
}

fn curve_of(body: &SignBody) -> Curve {
    match body {
        SignBody::Generic(p) => p.curve,
        _ => Curve::Secp256k1,
    }
}

fn path_of(body: &SignBody) -> DerivationPath {
    match body {
        SignBody::Bitcoin(p) => p.inputs.first().map(|i| i.signer_path).unwrap_or(p.change_path),
        SignBody::EthereumTransaction(p) => p.path,
        SignBody::EthereumMessage(p) => p.path,
        SignBody::Generic(p) => p.path,
        SignBody::ExtraData(_) => DerivationPath::from_slice(&[]),
    }
}

fn data_of(body: &SignBody) -> Vec<u8> {
    match body {
        SignBody::Bitcoin(_) => Vec::new(),
        SignBody::EthereumTransaction(p) => p.chunk.clone(),
        SignBody::EthereumMessage(p) => p.chunk.clone(),
        SignBody::Generic(p) => p.chunk.clone(),
        SignBody::ExtraData(f) => f.frame.clone(),
    }
}

fn verify_p256_der(client_pub: &[u8; 65], digest: &[u8], der_signature: &[u8; 74]) -> bool {
    let point = match p256::EncodedPoint::from_bytes(client_pub) {
        Ok(p) => p,
        Err(_) => return false,
    };
    let verifying_key = match p256::ecdsa::VerifyingKey::from_encoded_point(&point) {
        Ok(vk) => vk,
        Err(_) => return false,
    };
    // The DER signature is padded with trailing zeros to 74 bytes; find the
    // real DER length from its own header before parsing.
    let der_len = der_signature.get(1).map(|&l| l as usize + 2).unwrap_or(0);
    let der_bytes = match der_signature.get(..der_len.min(74)) {
        Some(b) => b,
        None => return false,
    };
    let signature = match P256Signature::from_der(der_bytes) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    verifying_key.verify(digest, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::signature::Signer;
    use p256::elliptic_curve::sec1::ToEncodedPoint;

    fn test_seed() -> [u8; 64] {
        [0x33u8; 64]
    }

    #[test]
    fn fresh_device_rejects_operations_before_pairing() {
        let device = Device::with_defaults(test_seed());
        let err = device.get_wallets().unwrap_err();
        assert_eq!(err, Error::PairFailed);
    }

    #[test]
    fn connect_enters_pairing_mode_and_returns_a_full_size_frame() {
        let device = Device::with_defaults(test_seed());
        let client_secret = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let client_pub = client_secret.verifying_key().to_encoded_point(false);
        let mut pub_bytes = [0u8; 65];
        pub_bytes.copy_from_slice(client_pub.as_bytes());

        let response = device.connect(pub_bytes).unwrap();
        assert_eq!(response.len(), crate::constants::FRAME_SIZE);

        // Still PairingMode, not yet Paired: ordinary operations stay
        // rejected until FinalizePairing completes.
        let err = device.get_wallets().unwrap_err();
        assert_eq!(err, Error::PairFailed);
    }

    #[test]
    fn get_addresses_honors_iter_idx_as_a_starting_offset() {
        let device = Device::with_defaults(test_seed());
        let client_secret = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let client_pub = client_secret.verifying_key().to_encoded_point(false);
        let mut pub_bytes = [0u8; 65];
        pub_bytes.copy_from_slice(client_pub.as_bytes());
        device.connect(pub_bytes).unwrap();

        let mut app_name_padded = [0u8; 25];
        app_name_padded[..4].copy_from_slice(b"test");
        let mut preimage = Vec::new();
        preimage.extend_from_slice(&pub_bytes);
        preimage.extend_from_slice(&app_name_padded);
        preimage.extend_from_slice(crate::constants::PAIRING_CODE_DEFAULT.as_bytes());
        let digest = Sha256::digest(&preimage);
        let signature: P256Signature = client_secret.sign(&digest);
        let der = signature.to_der();
        let mut der_padded = [0u8; 74];
        der_padded[..der.as_bytes().len()].copy_from_slice(der.as_bytes());
        let mut body = Vec::with_capacity(99);
        body.extend_from_slice(&app_name_padded);
        body.extend_from_slice(&der_padded);
        device.finalize_pairing(&body).unwrap();

        let make_request = |iter_idx: u8| {
            let mut body = vec![0u8; 54];
            body[32] = (4 << 4) | iter_idx; // depth=4, iter_idx
            body[33..37].copy_from_slice(&(44u32 | 0x8000_0000).to_be_bytes());
            body[37..41].copy_from_slice(&(60u32 | 0x8000_0000).to_be_bytes());
            body[41..45].copy_from_slice(&(0u32 | 0x8000_0000).to_be_bytes());
            body[45..49].copy_from_slice(&0u32.to_be_bytes());
            body[49..53].copy_from_slice(&0u32.to_be_bytes());
            body[53] = 1 << 4; // count=1, flag=0 (address)
            body
        };

        let from_zero = device.get_addresses(&make_request(0)).unwrap();
        let from_two = device.get_addresses(&make_request(2)).unwrap();
        assert_ne!(from_zero, from_two);
    }

    #[tokio::test]
    async fn generic_sign_with_empty_data_is_rejected() {
        let config = DeviceConfig::new(test_seed()).auto_approve(true);
        let device = Device::new(
            config,
            Box::new(crate::kv::InMemoryKvStore::new()),
            Box::new(crate::approval::AutoApprove),
            Box::new(crate::events::NullEventSink),
        );

        let client_secret = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let client_pub = client_secret.verifying_key().to_encoded_point(false);
        let mut pub_bytes = [0u8; 65];
        pub_bytes.copy_from_slice(client_pub.as_bytes());
        device.connect(pub_bytes).unwrap();

        let mut app_name_padded = [0u8; 25];
        app_name_padded[..4].copy_from_slice(b"test");
        let mut preimage = Vec::new();
        preimage.extend_from_slice(&pub_bytes);
        preimage.extend_from_slice(&app_name_padded);
        preimage.extend_from_slice(crate::constants::PAIRING_CODE_DEFAULT.as_bytes());
        let digest = Sha256::digest(&preimage);
        let signature: P256Signature = client_secret.sign(&digest);
        let der = signature.to_der();
        let mut der_padded = [0u8; 74];
        der_padded[..der.as_bytes().len()].copy_from_slice(der.as_bytes());
        let mut pairing_body = Vec::with_capacity(99);
        pairing_body.extend_from_slice(&app_name_padded);
        pairing_body.extend_from_slice(&der_padded);
        device.finalize_pairing(&pairing_body).unwrap();

        let mut body = vec![0u8, 5u8]; // has_extra_payloads=0, schema=GENERIC
        body.extend_from_slice(&[0u8; 32]);
        body.extend_from_slice(&0u32.to_be_bytes()); // encoding
        body.push(0); // hash_type
        body.push(0); // curve
        body.push(0); // path depth
        body.extend_from_slice(&[0u8; 20]);
        body.push(0); // omit_pubkey
        body.extend_from_slice(&0u16.to_le_bytes()); // declared_length = 0

        let err = device.sign(&body).await.unwrap_err();
        assert_eq!(err, Error::InvalidMsg);
    }
}
