// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_gauge_with_registry, HistogramVec, IntCounterVec, IntGauge, Registry,
};

const FINE_GRAINED_LATENCY_SEC_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 2.5, 3.0, 4.0, 5.0, 7.5, 10.,
    15., 20., 25., 30., 45., 60., 90., 120., 180., 240., 300., 450., 600., 900., 1200., 1800.,
];

#[derive(Clone, Debug)]
pub struct BridgeMetrics {
    pub(crate) fee_queries: IntCounterVec,
    pub(crate) err_fee_queries: IntCounterVec,

    pub(crate) burns_submitted: IntCounterVec,
    pub(crate) err_burns: IntCounterVec,

    pub(crate) attestation_polls: IntCounterVec,
    pub(crate) attestation_wait_latency: HistogramVec,

    pub(crate) mints_submitted: IntCounterVec,
    pub(crate) err_mints: IntCounterVec,
    pub(crate) mint_replays_rejected: IntCounterVec,

    pub(crate) transfer_outcomes: IntCounterVec,
    pub(crate) transfers_inflight: IntGauge,
    pub(crate) stage_latency: HistogramVec,

    pub(crate) eth_rpc_queries: IntCounterVec,
    pub(crate) eth_rpc_queries_latency: HistogramVec,
    pub(crate) solana_rpc_queries: IntCounterVec,
    pub(crate) solana_rpc_errors: IntCounterVec,
}

impl BridgeMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            fee_queries: register_int_counter_vec_with_registry!(
                "bridge_fee_queries",
                "Total number of attestation service fee/allowance queries",
                &["endpoint"],
                registry,
            )
            .unwrap(),
            err_fee_queries: register_int_counter_vec_with_registry!(
                "bridge_err_fee_queries",
                "Total number of failed fee/allowance queries",
                &["endpoint"],
                registry,
            )
            .unwrap(),
            burns_submitted: register_int_counter_vec_with_registry!(
                "bridge_burns_submitted",
                "Total number of confirmed burn transactions",
                &["source_domain", "finality"],
                registry,
            )
            .unwrap(),
            err_burns: register_int_counter_vec_with_registry!(
                "bridge_err_burns",
                "Total number of rejected or failed burns",
                &["source_domain", "error_type"],
                registry,
            )
            .unwrap(),
            attestation_polls: register_int_counter_vec_with_registry!(
                "bridge_attestation_polls",
                "Attestation poll responses by classification",
                &["status"],
                registry,
            )
            .unwrap(),
            attestation_wait_latency: register_histogram_vec_with_registry!(
                "bridge_attestation_wait_latency",
                "Time from burn confirmation until the attestation is ready",
                &["source_domain"],
                FINE_GRAINED_LATENCY_SEC_BUCKETS.to_vec(),
                registry,
            )
            .unwrap(),
            mints_submitted: register_int_counter_vec_with_registry!(
                "bridge_mints_submitted",
                "Total number of confirmed mint transactions",
                &["destination_domain"],
                registry,
            )
            .unwrap(),
            err_mints: register_int_counter_vec_with_registry!(
                "bridge_err_mints",
                "Total number of failed mints",
                &["destination_domain", "error_type"],
                registry,
            )
            .unwrap(),
            mint_replays_rejected: register_int_counter_vec_with_registry!(
                "bridge_mint_replays_rejected",
                "Proofs rejected locally because their nonce was already minted",
                &["source_domain"],
                registry,
            )
            .unwrap(),
            transfer_outcomes: register_int_counter_vec_with_registry!(
                "bridge_transfer_outcomes",
                "Finished transfers by outcome and the stage they ended in",
                &["outcome", "stage"],
                registry,
            )
            .unwrap(),
            transfers_inflight: register_int_gauge_with_registry!(
                "bridge_transfers_inflight",
                "Number of destination transfers currently in progress",
                registry,
            )
            .unwrap(),
            stage_latency: register_histogram_vec_with_registry!(
                "bridge_stage_latency",
                "Latency of each transfer stage",
                &["stage"],
                FINE_GRAINED_LATENCY_SEC_BUCKETS.to_vec(),
                registry,
            )
            .unwrap(),
            eth_rpc_queries: register_int_counter_vec_with_registry!(
                "bridge_eth_rpc_queries",
                "Total number of queries issued to eth provider, by request type",
                &["type"],
                registry,
            )
            .unwrap(),
            eth_rpc_queries_latency: register_histogram_vec_with_registry!(
                "bridge_eth_rpc_queries_latency",
                "Latency of queries issued to eth provider, by request type",
                &["type"],
                FINE_GRAINED_LATENCY_SEC_BUCKETS.to_vec(),
                registry,
            )
            .unwrap(),
            solana_rpc_queries: register_int_counter_vec_with_registry!(
                "bridge_solana_rpc_queries",
                "Total number of queries issued to solana rpc, by method",
                &["method"],
                registry,
            )
            .unwrap(),
            solana_rpc_errors: register_int_counter_vec_with_registry!(
                "bridge_solana_rpc_errors",
                "Total number of failed solana rpc calls, by method",
                &["method"],
                registry,
            )
            .unwrap(),
        }
    }

    pub fn new_for_testing() -> Self {
        let registry = Registry::new();
        Self::new(&registry)
    }
}
