// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use ethers::contract::abigen;

abigen!(
    TokenMessengerV2,
    r#"[
        function depositForBurn(uint256 amount, uint32 destinationDomain, bytes32 mintRecipient, address burnToken, bytes32 destinationCaller, uint256 maxFee, uint32 minFinalityThreshold)
    ]"#
);

abigen!(
    MessageTransmitterV2,
    r#"[
        function receiveMessage(bytes message, bytes attestation) returns (bool)
    ]"#
);

abigen!(
    EthErc20,
    r#"[
        function allowance(address owner, address spender) view returns (uint256)
        function approve(address spender, uint256 amount) returns (bool)
        function balanceOf(address account) view returns (uint256)
    ]"#
);
