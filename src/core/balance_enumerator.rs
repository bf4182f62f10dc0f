use std::sync::Arc;
use std::time::{Duration, Instant};

use arrayref::array_ref;
use byteorder::{ByteOrder, LittleEndian};
use rustc_hash::FxHashMap;

use crate::config::AggregatorConfig;
use crate::core::amount::format_amount;
use crate::core::constants::{mint_layout, token_account_layout, NATIVE_SCALE};
use crate::core::error::{AggregatorError, RpcError};
use crate::core::session::SubjectGuard;
use crate::rpc::LedgerRpc;
use crate::types::{
    Address, Holding, HoldingsReport, NativeBalance, RawTokenAccount, TokenKindInfo, UnitScale,
};

/// Fields of an SPL token account this crate reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedTokenAccount {
    pub mint: Address,
    pub owner: Address,
    pub amount: u64,
}

/// Decodes the fixed prefix of an SPL token account (Token and Token-2022 share it).
pub fn decode_token_account(data: &[u8]) -> Result<DecodedTokenAccount, RpcError> {
    if data.len() < token_account_layout::MIN_LEN {
        return Err(RpcError::malformed(format!(
            "token account data is {} bytes, need at least {}",
            data.len(),
            token_account_layout::MIN_LEN
        )));
    }
    let mint = array_ref!(data, token_account_layout::MINT_OFFSET, 32);
    let owner = array_ref!(data, token_account_layout::OWNER_OFFSET, 32);
    let amount = array_ref!(data, token_account_layout::AMOUNT_OFFSET, 8);

    Ok(DecodedTokenAccount {
        mint: Address::from_bytes(mint),
        owner: Address::from_bytes(owner),
        amount: LittleEndian::read_u64(amount),
    })
}

/// Reads decimals and supply out of an SPL mint account.
pub fn decode_mint(data: &[u8]) -> Result<TokenKindInfo, RpcError> {
    if data.len() < mint_layout::MIN_LEN {
        return Err(RpcError::malformed(format!(
            "mint data is {} bytes, need at least {}",
            data.len(),
            mint_layout::MIN_LEN
        )));
    }
    if data[mint_layout::IS_INITIALIZED_OFFSET] == 0 {
        return Err(RpcError::malformed("mint is not initialized"));
    }
    let supply = array_ref!(data, mint_layout::SUPPLY_OFFSET, 8);
    Ok(TokenKindInfo {
        scale: data[mint_layout::DECIMALS_OFFSET],
        supply: Some(LittleEndian::read_u64(supply)),
    })
}

/// Validates one listed entry: its key, its encoding and its SPL layout.
fn decode_listed(account: &RawTokenAccount) -> Result<(Address, DecodedTokenAccount), RpcError> {
    let sub_account = Address::parse(&account.sub_account)
        .map_err(|err| RpcError::malformed(err.to_string()))?;
    let data = account.data.as_ref().map_err(Clone::clone)?;
    Ok((sub_account, decode_token_account(data)?))
}

/// Descending by display amount, then token kind, then sub-account.
pub fn sort_holdings(holdings: &mut [Holding]) {
    holdings.sort_by(|a, b| {
        b.ui_amount()
            .total_cmp(&a.ui_amount())
            .then_with(|| a.token_kind.cmp(&b.token_kind))
            .then_with(|| a.sub_account.cmp(&b.sub_account))
    });
}

/// Lists an owner's non-zero token balances with their unit scales.
pub struct BalanceEnumerator<R: ?Sized> {
    rpc: Arc<R>,
    mint_lookup_delay: Duration,
}

impl<R: LedgerRpc + ?Sized> BalanceEnumerator<R> {
    pub fn new(rpc: Arc<R>, config: &AggregatorConfig) -> Self {
        Self {
            rpc,
            mint_lookup_delay: config.mint_lookup_delay(),
        }
    }

    /// Enumerates the guard's subject.
    ///
    /// The bulk listing failing aborts the run. Individual undecodable accounts
    /// and failed token-kind lookups are counted in `errors` and skipped.
    pub async fn enumerate(&self, guard: &SubjectGuard) -> Result<HoldingsReport, AggregatorError> {
        let owner = guard.subject();
        let t0 = Instant::now();

        let accounts = self.rpc.list_token_accounts(owner).await?;
        guard.ensure_current()?;

        let mut errors = 0usize;
        let mut rate_limited = false;
        let mut pending = Vec::with_capacity(accounts.len());
        for account in accounts {
            match decode_listed(&account) {
                Ok((_, decoded)) if decoded.amount == 0 => {}
                Ok((sub_account, decoded)) => pending.push((decoded.mint, sub_account, decoded.amount)),
                Err(err) => {
                    tracing::debug!("skipping sub-account {}: {err}", account.sub_account);
                    errors += 1;
                }
            }
        }

        let mut scales: FxHashMap<Address, UnitScale> = FxHashMap::default();
        let mut lookups = 0usize;
        let mut holdings = Vec::with_capacity(pending.len());

        for (token_kind, sub_account, raw) in pending {
            let scale = match scales.get(&token_kind) {
                Some(scale) => *scale,
                None => {
                    if lookups > 0 && !self.mint_lookup_delay.is_zero() {
                        tokio::time::sleep(self.mint_lookup_delay).await;
                        guard.ensure_current()?;
                    }
                    lookups += 1;

                    let lookup = self.rpc.get_token_kind_info(&token_kind).await;
                    guard.ensure_current()?;
                    match lookup {
                        Ok(info) => {
                            scales.insert(token_kind.clone(), info.scale);
                            info.scale
                        }
                        Err(err) => {
                            tracing::debug!("token kind {token_kind} lookup failed: {err}");
                            rate_limited |= err.is_rate_limited();
                            errors += 1;
                            continue;
                        }
                    }
                }
            };

            holdings.push(Holding {
                token_kind,
                sub_account,
                raw: u128::from(raw),
                scale,
            });
        }

        sort_holdings(&mut holdings);

        if rate_limited {
            tracing::warn!("rate limited while resolving token kinds for {owner}, {errors} holding(s) skipped");
        } else if errors > 0 {
            tracing::warn!("{errors} holding(s) of {owner} could not be resolved");
        }
        tracing::info!(
            "⏱️ enumerated {} holding(s) for {owner} with {lookups} lookup(s) in {:.1}ms",
            holdings.len(),
            t0.elapsed().as_secs_f64() * 1000.0
        );

        Ok(HoldingsReport {
            owner: owner.clone(),
            holdings,
            errors,
            rate_limited,
        })
    }

    /// Native balance of the guard's subject.
    pub async fn native_balance(&self, guard: &SubjectGuard) -> Result<NativeBalance, AggregatorError> {
        let lamports = self.rpc.get_balance(guard.subject()).await?;
        guard.ensure_current()?;
        Ok(NativeBalance {
            lamports,
            display: format_amount(u128::from(lamports), NATIVE_SCALE),
        })
    }
}
