//! On-chain wire codec
//!
//! Borsh bindings for the program's account layouts: user accounts, market
//! accounts, and the packed `DLOBOrders` buffer served by `/orders/idl`.
//! Account data starts with the program's 8-byte account discriminator
//! (sha256 of `account:<Name>`); the order buffer is raw concatenated
//! `{user, order}` tuples with no framing.
//!
//! Layouts here must stay bit-identical to the program — decode(encode(x))
//! is a hard invariant, and external clients parse these bytes directly.

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use types::account::{UserAccount, MAX_ORDERS};
use types::market::{MarketId, MarketType};
use types::oracle::OraclePriceData;
use types::order::Order;
use types::Pubkey;

/// Codec failures. Malformed accounts are skipped by callers, never fatal.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("account data truncated: need {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    #[error("account discriminator mismatch")]
    BadDiscriminator,

    #[error("borsh decode failed: {0}")]
    Borsh(#[from] std::io::Error),
}

/// A `{user, order}` tuple as packed into the order buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DlobOrder {
    pub user: Pubkey,
    pub order: Order,
}

/// 8-byte account discriminator, anchor-style: sha256("account:<name>")[..8].
fn discriminator(name: &str) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(b"account:");
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

fn read_pubkey(data: &mut &[u8]) -> Result<Pubkey, CodecError> {
    if data.len() < 32 {
        return Err(CodecError::Truncated {
            needed: 32,
            have: data.len(),
        });
    }
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&data[..32]);
    *data = &data[32..];
    Ok(Pubkey::new_from_array(bytes))
}

fn strip_discriminator<'a>(data: &'a [u8], name: &str) -> Result<&'a [u8], CodecError> {
    if data.len() < 8 {
        return Err(CodecError::Truncated {
            needed: 8,
            have: data.len(),
        });
    }
    if data[..8] != discriminator(name) {
        return Err(CodecError::BadDiscriminator);
    }
    Ok(&data[8..])
}

// --- user accounts ---------------------------------------------------------

/// Decode a user account from raw account data.
pub fn decode_user_account(data: &[u8]) -> Result<UserAccount, CodecError> {
    let mut rest = strip_discriminator(data, "User")?;
    let authority = read_pubkey(&mut rest)?;
    let sub_account_id = u16::deserialize(&mut rest)?;

    let mut orders = Vec::with_capacity(MAX_ORDERS);
    for _ in 0..MAX_ORDERS {
        orders.push(Order::deserialize(&mut rest)?);
    }

    let open_orders = u8::deserialize(&mut rest)?;
    let has_open_auction = bool::deserialize(&mut rest)?;
    let last_active_slot = u64::deserialize(&mut rest)?;

    Ok(UserAccount {
        authority,
        sub_account_id,
        orders,
        open_orders,
        has_open_auction,
        last_active_slot,
    })
}

/// Encode a user account to its on-chain byte layout.
pub fn encode_user_account(account: &UserAccount) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&discriminator("User"));
    buf.extend_from_slice(&account.authority.to_bytes());
    account.sub_account_id.serialize(&mut buf)?;
    for i in 0..MAX_ORDERS {
        let order = account.orders.get(i).copied().unwrap_or_default();
        order.serialize(&mut buf)?;
    }
    account.open_orders.serialize(&mut buf)?;
    account.has_open_auction.serialize(&mut buf)?;
    account.last_active_slot.serialize(&mut buf)?;
    Ok(buf)
}

// --- market accounts -------------------------------------------------------

/// Decoded market account: identity, latest oracle data, AMM state, and
/// venue addresses for spot markets.
#[derive(Debug, Clone, BorshSerialize, BorshDeserialize)]
pub struct MarketAccount {
    pub name: [u8; 32],
    pub market_index: u16,
    pub market_type: MarketType,
    pub last_oracle_price: i64,
    pub last_oracle_conf: u64,
    pub last_oracle_twap: i64,
    pub last_oracle_slot: u64,
    pub base_asset_reserve: u128,
    pub quote_asset_reserve: u128,
    pub peg_multiplier: u128,
    pub base_spread: u32,
    pub max_base_asset_reserve: u128,
    pub min_base_asset_reserve: u128,
    pub has_phoenix_market: bool,
    pub phoenix_market: [u8; 32],
    pub has_serum_market: bool,
    pub serum_market: [u8; 32],
}

impl MarketAccount {
    pub fn market_id(&self) -> MarketId {
        MarketId {
            market_type: self.market_type,
            market_index: self.market_index,
        }
    }

    /// Market name with zero-padding trimmed.
    pub fn name_str(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(32);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    pub fn oracle_price_data(&self) -> OraclePriceData {
        OraclePriceData::new(
            self.last_oracle_price,
            self.last_oracle_conf,
            self.last_oracle_twap,
            self.last_oracle_slot,
        )
    }

    pub fn phoenix_market_pubkey(&self) -> Option<Pubkey> {
        self.has_phoenix_market
            .then(|| Pubkey::new_from_array(self.phoenix_market))
    }

    pub fn serum_market_pubkey(&self) -> Option<Pubkey> {
        self.has_serum_market
            .then(|| Pubkey::new_from_array(self.serum_market))
    }
}

pub fn decode_market_account(data: &[u8]) -> Result<MarketAccount, CodecError> {
    let mut rest = strip_discriminator(data, "Market")?;
    Ok(MarketAccount::deserialize(&mut rest)?)
}

pub fn encode_market_account(market: &MarketAccount) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&discriminator("Market"));
    market.serialize(&mut buf)?;
    Ok(buf)
}

// --- DLOBOrders buffer -----------------------------------------------------

/// Pack `{user, order}` tuples into the raw concatenated buffer.
pub fn encode_dlob_orders(orders: &[DlobOrder]) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    for entry in orders {
        buf.extend_from_slice(&entry.user.to_bytes());
        entry.order.serialize(&mut buf)?;
    }
    Ok(buf)
}

/// Decode a raw order buffer back into tuples.
pub fn decode_dlob_orders(data: &[u8]) -> Result<Vec<DlobOrder>, CodecError> {
    let mut rest = data;
    let mut out = Vec::new();
    while !rest.is_empty() {
        let user = read_pubkey(&mut rest)?;
        let order = Order::deserialize(&mut rest)?;
        out.push(DlobOrder { user, order });
    }
    Ok(out)
}
