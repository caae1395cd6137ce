//! Contract Deployment Artifacts
//!
//! Truffle-style JSON artifacts: a contract name plus a map from network id
//! to deployed address. Everything else in the file (ABI, bytecode) is
//! ignored here.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Artifact loading and resolution errors
#[derive(Debug, Clone, Error)]
pub enum ArtifactError {
    #[error("failed to read artifacts: {0}")]
    Io(String),

    #[error("failed to parse artifact {0}: {1}")]
    Parse(String, String),

    #[error("no artifact loaded for contract {0}")]
    MissingArtifact(String),

    #[error("no deployment info found for contract {contract}, network ID {network_id}")]
    MissingDeployment { contract: String, network_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractArtifact {
    #[serde(rename = "contractName")]
    pub contract_name: String,
    #[serde(default)]
    pub networks: HashMap<String, DeploymentInfo>,
}

/// Contracts the client binds at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractRole {
    System,
    Token,
    DepositToken,
    FeeRebateToken,
    DepositFactory,
    VendingMachine,
}

impl ContractRole {
    pub const ALL: [ContractRole; 6] = [
        ContractRole::System,
        ContractRole::Token,
        ContractRole::DepositToken,
        ContractRole::FeeRebateToken,
        ContractRole::DepositFactory,
        ContractRole::VendingMachine,
    ];

    /// Contract name as it appears in the artifact
    pub fn artifact_name(&self) -> &'static str {
        match self {
            ContractRole::System => "TBTCSystem",
            ContractRole::Token => "TBTCToken",
            ContractRole::DepositToken => "TBTCDepositToken",
            ContractRole::FeeRebateToken => "FeeRebateToken",
            ContractRole::DepositFactory => "DepositFactory",
            ContractRole::VendingMachine => "VendingMachine",
        }
    }
}

impl fmt::Display for ContractRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.artifact_name())
    }
}

/// Resolved addresses of every bound contract on one network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    pub system: Address,
    pub token: Address,
    pub deposit_token: Address,
    pub fee_rebate_token: Address,
    pub deposit_factory: Address,
    pub vending_machine: Address,
}

/// Artifacts by contract name
#[derive(Debug, Clone, Default)]
pub struct DeploymentRegistry {
    artifacts: HashMap<String, ContractArtifact>,
}

impl DeploymentRegistry {
    pub fn from_artifacts(artifacts: impl IntoIterator<Item = ContractArtifact>) -> Self {
        let artifacts = artifacts
            .into_iter()
            .map(|artifact| (artifact.contract_name.clone(), artifact))
            .collect();
        Self { artifacts }
    }

    /// Load every `*.json` file in `dir`
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| ArtifactError::Io(format!("{}: {}", dir.display(), e)))?;

        let mut artifacts = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ArtifactError::Io(e.to_string()))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ArtifactError::Io(format!("{}: {}", path.display(), e)))?;
            let artifact: ContractArtifact = serde_json::from_str(&contents)
                .map_err(|e| ArtifactError::Parse(path.display().to_string(), e.to_string()))?;
            artifacts.push(artifact);
        }

        tracing::debug!(dir = %dir.display(), count = artifacts.len(), "Loaded contract artifacts");
        Ok(Self::from_artifacts(artifacts))
    }

    pub fn insert(&mut self, artifact: ContractArtifact) {
        self.artifacts.insert(artifact.contract_name.clone(), artifact);
    }

    /// Deployed address of `role` on `network_id`
    pub fn address_of(&self, role: ContractRole, network_id: &str) -> Result<Address, ArtifactError> {
        let artifact = self
            .artifacts
            .get(role.artifact_name())
            .ok_or_else(|| ArtifactError::MissingArtifact(role.artifact_name().to_string()))?;

        artifact
            .networks
            .get(network_id)
            .map(|deployment| deployment.address)
            .ok_or_else(|| ArtifactError::MissingDeployment {
                contract: artifact.contract_name.clone(),
                network_id: network_id.to_string(),
            })
    }

    /// Resolve every role, failing on the first one without deployment info
    pub fn resolve(&self, network_id: &str) -> Result<ContractAddresses, ArtifactError> {
        Ok(ContractAddresses {
            system: self.address_of(ContractRole::System, network_id)?,
            token: self.address_of(ContractRole::Token, network_id)?,
            deposit_token: self.address_of(ContractRole::DepositToken, network_id)?,
            fee_rebate_token: self.address_of(ContractRole::FeeRebateToken, network_id)?,
            deposit_factory: self.address_of(ContractRole::DepositFactory, network_id)?,
            vending_machine: self.address_of(ContractRole::VendingMachine, network_id)?,
        })
    }
}
