use alloy::sol;

sol! {
    /// Minimal ERC20 surface the client needs: balances for the deposit
    /// guard and the allowance/approve pair for the approval phase.
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string memory);
    }
}

sol! {
    /// Deposit-side settlement contract.
    ///
    /// Reserves are keyed by a bytes32 token id. Balances returned here are
    /// index-scaled; multiply by the current liquidity index (RAY) to obtain
    /// live value.
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    interface IDepositManager {
        /// Reserve configuration and state as stored at the last accrual.
        struct Asset {
            address token;
            string symbol;
            uint8 decimals;
            bool isActive;
            uint256 liquidityIndex;
            uint256 lastUpdateTimestamp;
            uint256 totalScaledSupply;
            uint256 totalBorrowsScaled;
            uint256 baseRate;
            uint256 slope1;
            uint256 slope2;
            uint256 kink;
            uint256 reserveFactor;
        }

        function getSupportedTokens() external view returns (bytes32[] memory);
        function getAsset(bytes32 tokenId) external view returns (Asset memory);

        /// Index-scaled deposit balance of `account` for `tokenId`.
        function balanceOf(bytes32 tokenId, address account) external view returns (uint256);

        /// Fixed-point scale used for all indexes, 10^27.
        function RAY() external view returns (uint256);

        function deposit(bytes32 tokenId, uint256 amount) external;
        function withdraw(bytes32 tokenId, uint256 amount) external;
    }
}

sol! {
    /// Borrow-side settlement contract.
    ///
    /// Borrow and repay take oracle update payloads and refresh the feeds
    /// before touching balances; the required update fee must be attached
    /// as msg.value.
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    interface IBorrowManager {
        /// Cumulative borrow index (RAY) for `tokenId`; zero when the
        /// reserve has never accrued debt.
        function borrowIndex(bytes32 tokenId) external view returns (uint256);

        /// Index-scaled debt of `account` for `tokenId`.
        function userBorrowScaled(bytes32 tokenId, address account) external view returns (uint256);

        function borrow(
            bytes32 tokenId,
            uint256 amount,
            bytes[] calldata updateData,
            bytes32[] calldata priceIds
        ) external payable;

        function repay(
            bytes32 tokenId,
            uint256 amount,
            bytes[] calldata updateData,
            bytes32[] calldata priceIds
        ) external payable;
    }
}

sol! {
    /// The slice of the Pyth oracle contract the client consumes.
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    interface IPyth {
        /// Fee (wei) required to submit the given update payloads.
        function getUpdateFee(bytes[] calldata updateData) external view returns (uint256);

        function updatePriceFeeds(bytes[] calldata updateData) external payable;
    }
}

sol! {
    /// Mock oracle deployed in test environments; fabricates signed update
    /// payloads for arbitrary price data.
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    interface IMockPyth {
        function createPriceFeedUpdateData(
            bytes32 id,
            int64 price,
            uint64 conf,
            int32 expo,
            int64 emaPrice,
            uint64 emaConf,
            uint64 publishTime,
            uint64 prevPublishTime
        ) external view returns (bytes memory);
    }
}
