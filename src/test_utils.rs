//! Shared test fixtures: Polkadot-shaped runtime metadata, well-known accounts and an
//! ed25519 signer with a fixed seed

use crate::address::AccountId;
use crate::codec::TypeRegistry;
use crate::error::WasmSubstrateError;
use crate::metadata::schema::{Primitive, RuntimeSchema, SignedExtension, TypeDef, TypeId};
use crate::metadata::MetadataRegistry;
use crate::signer::Signer;
use crate::transaction::SignatureScheme;
use crate::types::{Material, RuntimeVersion, SigningContext, H256};
use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use frame_metadata::RuntimeMetadataPrefixed;
use parity_scale_codec::Encode;
use scale_info::{meta_type, MetaType};
use std::sync::Arc;

pub const ALICE_SS58: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
pub const ALICE_HEX: &str = "0xd43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d";
pub const BOB_SS58: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";
pub const BOB_HEX: &str = "0x8eaf04151687736326c9fea17e25fc5287613693c912909cb226aa4794f26a48";

pub const GENESIS_HASH: &str = "0x91b171bb158e2d3848fa23a9f1c25182fb8e20313b2c1eb49219da7a70ce90c3";
pub const BLOCK_HASH: &str = "0xecf035153224646684a4aec5e91a218610b59b4e812ade8620354665d093c489";
pub const BLOCK_NUMBER: u64 = 1000;
pub const SPEC_VERSION: u32 = 9430;
pub const TX_VERSION: u32 = 24;

const TEST_SEED: [u8; 32] = [
    0x9d, 0x61, 0xb1, 0x9d, 0xef, 0xfd, 0x5a, 0x60, 0xba, 0x84, 0x4a, 0xf4, 0x92, 0xec, 0x2c, 0xc4,
    0x44, 0x49, 0xc5, 0x69, 0x7b, 0x32, 0x69, 0x19, 0x70, 0x3b, 0xac, 0x03, 0x1c, 0xae, 0x7f, 0x60,
];

pub fn alice() -> AccountId {
    AccountId::parse(ALICE_HEX).unwrap()
}

pub fn bob() -> AccountId {
    AccountId::parse(BOB_HEX).unwrap()
}

/// Deterministic account distinct from Alice and Bob
pub fn account(byte: u8) -> AccountId {
    AccountId([byte; 32])
}

pub fn test_runtime_version() -> RuntimeVersion {
    RuntimeVersion {
        spec_name: "polkadot".to_string(),
        spec_version: SPEC_VERSION,
        transaction_version: TX_VERSION,
    }
}

/// Types of a Polkadot-shaped runtime, described through `scale_info` the way a real
/// runtime describes itself
#[allow(dead_code, non_camel_case_types)]
mod runtime {
    use scale_info::TypeInfo;
    use std::marker::PhantomData;

    pub type Balance = u128;

    #[derive(TypeInfo)]
    pub struct AccountId32(pub [u8; 32]);

    #[derive(TypeInfo)]
    pub struct H256(pub [u8; 32]);

    #[derive(TypeInfo)]
    pub enum MultiAddress {
        #[codec(index = 0)]
        Id(AccountId32),
        #[codec(index = 1)]
        Index(#[codec(compact)] ()),
        #[codec(index = 2)]
        Raw(Vec<u8>),
        #[codec(index = 3)]
        Address32([u8; 32]),
        #[codec(index = 4)]
        Address20([u8; 20]),
    }

    #[derive(TypeInfo)]
    pub enum MultiSignature {
        #[codec(index = 0)]
        Ed25519([u8; 64]),
        #[codec(index = 1)]
        Sr25519([u8; 64]),
        #[codec(index = 2)]
        Ecdsa([u8; 65]),
    }

    #[derive(TypeInfo)]
    pub struct Timepoint {
        pub height: u32,
        pub index: u32,
    }

    #[derive(TypeInfo)]
    pub struct Weight {
        #[codec(compact)]
        pub ref_time: u64,
        #[codec(compact)]
        pub proof_size: u64,
    }

    #[derive(TypeInfo)]
    pub enum RewardDestination {
        #[codec(index = 0)]
        Staked,
        #[codec(index = 1)]
        Stash,
        #[codec(index = 2)]
        Controller,
        #[codec(index = 3)]
        Account(AccountId32),
        #[codec(index = 4)]
        None,
    }

    pub mod system {
        use scale_info::TypeInfo;

        #[derive(TypeInfo)]
        pub enum Call {
            #[codec(index = 0)]
            remark { remark: Vec<u8> },
        }
    }

    pub mod balances {
        use super::{Balance, MultiAddress};
        use scale_info::TypeInfo;

        #[derive(TypeInfo)]
        pub enum Call {
            #[codec(index = 0)]
            transfer_allow_death {
                dest: MultiAddress,
                #[codec(compact)]
                value: Balance,
            },
            #[codec(index = 3)]
            transfer_keep_alive {
                dest: MultiAddress,
                #[codec(compact)]
                value: Balance,
            },
            #[codec(index = 4)]
            transfer_all { dest: MultiAddress, keep_alive: bool },
        }
    }

    pub mod staking {
        use super::{Balance, RewardDestination};
        use scale_info::TypeInfo;

        #[derive(TypeInfo)]
        pub enum Call {
            #[codec(index = 0)]
            bond {
                #[codec(compact)]
                value: Balance,
                payee: RewardDestination,
            },
            #[codec(index = 6)]
            chill,
        }
    }

    pub mod utility {
        use super::RuntimeCall;
        use scale_info::TypeInfo;

        #[derive(TypeInfo)]
        pub enum Call {
            #[codec(index = 0)]
            batch { calls: Vec<RuntimeCall> },
            #[codec(index = 2)]
            batch_all { calls: Vec<RuntimeCall> },
        }
    }

    pub mod multisig {
        use super::{AccountId32, RuntimeCall, Timepoint, Weight};
        use scale_info::TypeInfo;

        #[derive(TypeInfo)]
        pub enum Call {
            #[codec(index = 0)]
            as_multi_threshold_1 {
                other_signatories: Vec<AccountId32>,
                call: Box<RuntimeCall>,
            },
            #[codec(index = 1)]
            as_multi {
                threshold: u16,
                other_signatories: Vec<AccountId32>,
                maybe_timepoint: Option<Timepoint>,
                call: Box<RuntimeCall>,
                max_weight: Weight,
            },
            #[codec(index = 2)]
            approve_as_multi {
                threshold: u16,
                other_signatories: Vec<AccountId32>,
                maybe_timepoint: Option<Timepoint>,
                call_hash: [u8; 32],
                max_weight: Weight,
            },
            #[codec(index = 3)]
            cancel_as_multi {
                threshold: u16,
                other_signatories: Vec<AccountId32>,
                timepoint: Timepoint,
                call_hash: [u8; 32],
            },
        }
    }

    #[derive(TypeInfo)]
    pub enum RuntimeCall {
        #[codec(index = 0)]
        System(system::Call),
        #[codec(index = 5)]
        Balances(balances::Call),
        #[codec(index = 7)]
        Staking(staking::Call),
        #[codec(index = 26)]
        Utility(utility::Call),
        #[codec(index = 30)]
        Multisig(multisig::Call),
    }

    #[derive(TypeInfo)]
    pub enum Era {
        #[codec(index = 0)]
        Immortal,
        #[codec(index = 1)]
        Mortal1(u8),
    }

    #[derive(TypeInfo)]
    pub struct CheckNonZeroSender;
    #[derive(TypeInfo)]
    pub struct CheckSpecVersion;
    #[derive(TypeInfo)]
    pub struct CheckTxVersion;
    #[derive(TypeInfo)]
    pub struct CheckGenesis;
    #[derive(TypeInfo)]
    pub struct CheckMortality(pub Era);
    #[derive(TypeInfo)]
    pub struct CheckNonce(#[codec(compact)] pub u32);
    #[derive(TypeInfo)]
    pub struct CheckWeight;
    #[derive(TypeInfo)]
    pub struct ChargeTransactionPayment(#[codec(compact)] pub Balance);

    pub type SignedExtra = (
        CheckNonZeroSender,
        CheckSpecVersion,
        CheckTxVersion,
        CheckGenesis,
        CheckMortality,
        CheckNonce,
        CheckWeight,
        ChargeTransactionPayment,
    );

    #[derive(TypeInfo)]
    pub struct UncheckedExtrinsic<Address, Call, Signature, Extra>(
        PhantomData<(Address, Call, Signature, Extra)>,
    );

    #[derive(TypeInfo)]
    pub struct Runtime;
}

/// (identifier, extra type, additional-signed type) in payload order
fn signed_extensions() -> Vec<(&'static str, MetaType, MetaType)> {
    use runtime as rt;
    vec![
        ("CheckNonZeroSender", meta_type::<rt::CheckNonZeroSender>(), meta_type::<()>()),
        ("CheckSpecVersion", meta_type::<rt::CheckSpecVersion>(), meta_type::<u32>()),
        ("CheckTxVersion", meta_type::<rt::CheckTxVersion>(), meta_type::<u32>()),
        ("CheckGenesis", meta_type::<rt::CheckGenesis>(), meta_type::<rt::H256>()),
        ("CheckMortality", meta_type::<rt::CheckMortality>(), meta_type::<rt::H256>()),
        ("CheckNonce", meta_type::<rt::CheckNonce>(), meta_type::<()>()),
        ("CheckWeight", meta_type::<rt::CheckWeight>(), meta_type::<()>()),
        (
            "ChargeTransactionPayment",
            meta_type::<rt::ChargeTransactionPayment>(),
            meta_type::<()>(),
        ),
    ]
}

/// (name, index, call enum) of every pallet
fn pallets() -> Vec<(&'static str, u8, MetaType)> {
    use runtime as rt;
    vec![
        ("System", 0, meta_type::<rt::system::Call>()),
        ("Balances", 5, meta_type::<rt::balances::Call>()),
        ("Staking", 7, meta_type::<rt::staking::Call>()),
        ("Utility", 26, meta_type::<rt::utility::Call>()),
        ("Multisig", 30, meta_type::<rt::multisig::Call>()),
    ]
}

/// V14 metadata as `state_getMetadata` returns it
pub fn test_metadata_blob() -> Vec<u8> {
    use frame_metadata::v14::{
        ExtrinsicMetadata, PalletCallMetadata, PalletMetadata, RuntimeMetadataV14,
        SignedExtensionMetadata,
    };
    use runtime::{MultiAddress, MultiSignature, Runtime, RuntimeCall, SignedExtra, UncheckedExtrinsic};

    let pallets = pallets()
        .into_iter()
        .map(|(name, index, calls)| PalletMetadata {
            name,
            storage: None,
            calls: Some(PalletCallMetadata { ty: calls }),
            event: None,
            constants: vec![],
            error: None,
            index,
        })
        .collect();
    let extrinsic = ExtrinsicMetadata {
        ty: meta_type::<UncheckedExtrinsic<MultiAddress, RuntimeCall, MultiSignature, SignedExtra>>(),
        version: 4,
        signed_extensions: signed_extensions()
            .into_iter()
            .map(|(identifier, ty, additional_signed)| SignedExtensionMetadata {
                identifier,
                ty,
                additional_signed,
            })
            .collect(),
    };
    RuntimeMetadataPrefixed::from(RuntimeMetadataV14::new(
        pallets,
        extrinsic,
        meta_type::<Runtime>(),
    ))
    .encode()
}

/// The same runtime described as V15 metadata
pub fn test_metadata_v15() -> RuntimeMetadataPrefixed {
    use frame_metadata::v15::{
        CustomMetadata, ExtrinsicMetadata, OuterEnums, PalletCallMetadata, PalletMetadata,
        RuntimeMetadataV15, SignedExtensionMetadata,
    };
    use runtime::{MultiAddress, MultiSignature, Runtime, RuntimeCall, SignedExtra};

    let pallets = pallets()
        .into_iter()
        .map(|(name, index, calls)| PalletMetadata {
            name,
            storage: None,
            calls: Some(PalletCallMetadata { ty: calls }),
            event: None,
            constants: vec![],
            error: None,
            index,
            docs: vec![],
        })
        .collect();
    let extrinsic = ExtrinsicMetadata {
        version: 4,
        address_ty: meta_type::<MultiAddress>(),
        call_ty: meta_type::<RuntimeCall>(),
        signature_ty: meta_type::<MultiSignature>(),
        extra_ty: meta_type::<SignedExtra>(),
        signed_extensions: signed_extensions()
            .into_iter()
            .map(|(identifier, ty, additional_signed)| SignedExtensionMetadata {
                identifier,
                ty,
                additional_signed,
            })
            .collect(),
    };
    RuntimeMetadataPrefixed::from(RuntimeMetadataV15::new(
        pallets,
        extrinsic,
        meta_type::<Runtime>(),
        vec![],
        OuterEnums {
            call_enum_ty: meta_type::<RuntimeCall>(),
            event_enum_ty: meta_type::<()>(),
            error_enum_ty: meta_type::<()>(),
        },
        CustomMetadata {
            map: Default::default(),
        },
    ))
}

/// Schema of the fixture runtime, for tests that tweak it before loading
pub fn test_schema() -> RuntimeSchema {
    test_metadata().schema().clone()
}

pub fn test_metadata_with(schema: RuntimeSchema) -> Arc<MetadataRegistry> {
    Arc::new(MetadataRegistry::from_schema(schema, 14, test_runtime_version()).unwrap())
}

pub fn test_metadata() -> Arc<MetadataRegistry> {
    Arc::new(MetadataRegistry::new(&test_metadata_blob(), test_runtime_version()).unwrap())
}

pub fn test_registry() -> TypeRegistry {
    TypeRegistry::new(test_metadata()).unwrap()
}

/// Fixture registry paying tips through `ChargeAssetTxPayment` and carrying
/// `CheckMetadataHash` last
pub fn test_registry_with_newer_extensions() -> TypeRegistry {
    let mut schema = test_schema();
    let u8_id = schema
        .types
        .iter()
        .position(|t| t.def == TypeDef::Primitive(Primitive::U8))
        .unwrap() as TypeId;
    let extensions = &mut schema.extrinsic.signed_extensions;
    for ext in extensions.iter_mut() {
        if ext.identifier == "ChargeTransactionPayment" {
            ext.identifier = "ChargeAssetTxPayment".to_string();
        }
    }
    extensions.push(SignedExtension {
        identifier: "CheckMetadataHash".to_string(),
        ty: u8_id,
        additional_signed: u8_id,
    });
    TypeRegistry::new(test_metadata_with(schema)).unwrap()
}

pub fn test_material() -> Material {
    Material {
        genesis_hash: H256::from_hex(GENESIS_HASH).unwrap(),
        chain_name: "Polkadot".to_string(),
        spec_name: "polkadot".to_string(),
        spec_version: SPEC_VERSION,
        tx_version: TX_VERSION,
        metadata: format!("0x{}", hex::encode(test_metadata_blob())),
    }
}

/// Nonce 0, tip 0, era period 64 at block 1000
pub fn test_context(sender: AccountId) -> SigningContext {
    SigningContext {
        sender,
        nonce: 0,
        tip: 0,
        era_period: 64,
        block_number: BLOCK_NUMBER,
        block_hash: H256::from_hex(BLOCK_HASH).unwrap(),
        genesis_hash: H256::from_hex(GENESIS_HASH).unwrap(),
        spec_version: SPEC_VERSION,
        transaction_version: TX_VERSION,
    }
}

/// Ed25519 signer with a fixed key
pub struct TestSigner {
    key: SigningKey,
}

impl TestSigner {
    pub fn new() -> Self {
        Self::from_seed(TEST_SEED)
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        TestSigner {
            key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

impl Signer for TestSigner {
    fn account_id(&self) -> AccountId {
        AccountId(self.key.verifying_key().to_bytes())
    }

    fn scheme(&self) -> SignatureScheme {
        SignatureScheme::Ed25519
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, WasmSubstrateError> {
        Ok(self.key.sign(payload).to_bytes().to_vec())
    }
}
