use ethers::{
    abi::Abi,
    contract::BaseContract,
    types::{
        transaction::eip2718::TypedTransaction, Address, Eip1559TransactionRequest,
        TransactionRequest, U256,
    },
};
use tracing::{debug, info, warn};

use crate::{
    blockchain::{parse_address, parse_wei, ChainProvider},
    config::{BundleConfig, OpportunityConfig},
    error::BotError,
    fees::{gwei, max_fee_per_gas},
    types::{BaseTransaction, FeeParameters, PricedTransaction},
};

const BUNDLE_EXECUTOR_ABI: &str = r#"
[
    {
        "inputs": [],
        "name": "deposit",
        "outputs": [],
        "stateMutability": "payable",
        "type": "function"
    },
    {
        "inputs": [
            {"internalType": "address", "name": "token1", "type": "address"},
            {"internalType": "address", "name": "token2", "type": "address"},
            {"internalType": "uint256", "name": "borrow_amount", "type": "uint256"},
            {"internalType": "address", "name": "router1", "type": "address"},
            {"internalType": "address", "name": "router2", "type": "address"}
        ],
        "name": "flashloan",
        "outputs": [],
        "stateMutability": "nonpayable",
        "type": "function"
    },
    {
        "inputs": [],
        "name": "logic1",
        "outputs": [],
        "stateMutability": "nonpayable",
        "type": "function"
    },
    {
        "inputs": [],
        "stateMutability": "nonpayable",
        "type": "constructor"
    }
]
"#;

/// Arguments of `flashloan(token1, token2, borrow_amount, router1, router2)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashloanParams {
    pub token1: Address,
    pub token2: Address,
    pub borrow_amount: U256,
    pub router1: Address,
    pub router2: Address,
}

impl FlashloanParams {
    pub fn from_config(config: &OpportunityConfig) -> anyhow::Result<Self> {
        Ok(Self {
            token1: parse_address(&config.token1)?,
            token2: parse_address(&config.token2)?,
            borrow_amount: parse_wei(&config.borrow_amount)?,
            router1: parse_address(&config.router1)?,
            router2: parse_address(&config.router2)?,
        })
    }
}

pub struct TransactionBuilder {
    executor: BaseContract,
    executor_address: Address,
    legacy_gas_price: U256,
    initial_gas_limit: U256,
    large_estimate_threshold: U256,
}

impl TransactionBuilder {
    pub fn new(executor_address: Address, bundle: &BundleConfig) -> Result<Self, BotError> {
        let abi: Abi = serde_json::from_str(BUNDLE_EXECUTOR_ABI)
            .map_err(|e| BotError::Abi(format!("Invalid executor ABI: {}", e)))?;

        Ok(Self {
            executor: BaseContract::from(abi),
            executor_address,
            legacy_gas_price: gwei(bundle.legacy_gas_price_gwei),
            initial_gas_limit: U256::from(bundle.initial_gas_limit),
            large_estimate_threshold: U256::from(bundle.large_estimate_threshold),
        })
    }

    pub fn executor_address(&self) -> Address {
        self.executor_address
    }

    /// Encodes the flash-loan call. Gas fields are placeholders for estimation.
    pub fn build_base_transaction(
        &self,
        params: &FlashloanParams,
    ) -> Result<BaseTransaction, BotError> {
        let data = self
            .executor
            .encode(
                "flashloan",
                (
                    params.token1,
                    params.token2,
                    params.borrow_amount,
                    params.router1,
                    params.router2,
                ),
            )
            .map_err(|e| BotError::Abi(format!("Failed to encode flashloan call: {}", e)))?;

        debug!("Encoded flashloan call ({} bytes)", data.len());

        Ok(BaseTransaction {
            to: self.executor_address,
            data,
            gas_price: self.legacy_gas_price,
            gas_limit: self.initial_gas_limit,
        })
    }

    /// Estimates the call as `sender` and doubles the estimate into the gas limit.
    pub async fn estimate_and_size(
        &self,
        provider: &dyn ChainProvider,
        base: BaseTransaction,
        sender: Address,
    ) -> Result<BaseTransaction, BotError> {
        let request: TypedTransaction = TransactionRequest::new()
            .from(sender)
            .to(base.to)
            .data(base.data.clone())
            .gas_price(base.gas_price)
            .gas(base.gas_limit)
            .into();

        let estimate = provider
            .estimate_gas(&request)
            .await
            .map_err(|e| BotError::Estimation(e.to_string()))?;

        if estimate.is_zero() {
            return Err(BotError::Estimation(
                "provider returned an empty estimate".to_string(),
            ));
        }

        if estimate > self.large_estimate_threshold {
            warn!(
                "EstimateGas succeeded, but suspiciously large: {}",
                estimate
            );
        }

        let gas_limit = estimate * U256::from(2);
        info!("Gas estimate {}, gas limit set to {}", estimate, gas_limit);

        Ok(BaseTransaction { gas_limit, ..base })
    }
}

/// Prices the base transaction for one block.
pub fn price_for_block(
    base: &BaseTransaction,
    fees: &FeeParameters,
    chain_id: u64,
) -> PricedTransaction {
    PricedTransaction {
        to: base.to,
        data: base.data.clone(),
        max_fee_per_gas: max_fee_per_gas(fees),
        max_priority_fee_per_gas: fees.priority_fee,
        gas_limit: base.gas_limit,
        chain_id,
    }
}

impl PricedTransaction {
    pub fn to_typed_transaction(&self, from: Address, nonce: U256) -> TypedTransaction {
        Eip1559TransactionRequest::new()
            .from(from)
            .to(self.to)
            .data(self.data.clone())
            .value(U256::zero())
            .gas(self.gas_limit)
            .max_fee_per_gas(self.max_fee_per_gas)
            .max_priority_fee_per_gas(self.max_priority_fee_per_gas)
            .chain_id(self.chain_id)
            .nonce(nonce)
            .into()
    }
}
