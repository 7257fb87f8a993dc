//! Solidity bindings for every contract this service reads or writes.
//!
//! Uses alloy's `sol!` macro to generate type-safe ABI encoders/decoders
//! for the per-user vault, its factory, and the external lending markets
//! the rate oracle queries.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IPortfolioVault {
        struct AssetStruct {
            address asset;
            uint256 balance;
            uint256 investedInAave;
            uint256 investedInCompound;
            uint256 investedInUniswap;
        }

        function getStruct(address _token) external view returns (AssetStruct memory);
        function depositERC20(address _token, uint256 _amount) external;
        function withdrawERC20(address _token, uint256 _amount) external;
        function lendTokens(string calldata protocol, address token, uint256 amount) external;
        function withdrawLentTokens(string calldata protocol, address token, uint256 amount) external returns (uint256 amountWithdrawn);
        function addLiquidity(
            string calldata protocol, address token0, address token1,
            uint256 amount0, uint256 amount1, uint24 fee, int24 tickLower, int24 tickUpper
        ) external;
        function removeLiquidity(string calldata protocol, address token0, address token1, uint256 liquidityAmount) external;
        function swapOnUniswap(address _tokenIn, address _tokenOut, uint256 _amountIn, uint24 _fee) external returns (uint256 amountOut);

        event ERC20Deposited(address indexed token, uint256 amount);
        event ERC20Withdrawn(address indexed token, uint256 amount);
        event LiquidityAdded(address indexed pool, address token0, address token1, uint128 liquidity, uint256 amount0, uint256 amount1);
        event LiquidityRemoved(address indexed pool, address token0, address token1, uint128 liquidity, uint256 amount0, uint256 amount1);
        event LiquiditySupplied(string protocol, address indexed asset, uint256 amount);
        event LiquidityWithdrawn(string protocol, address indexed asset, uint256 amount);
        event TokensSwapped(address indexed protocol, address tokenIn, address tokenOut, uint256 amountIn, uint256 amountOut);
    }

    #[sol(rpc)]
    interface IVaultFactory {
        function createVault(address owner) external returns (address vault);
        function ownerToVaultAddress(address owner) external view returns (address);

        event VaultCreated(address indexed owner, address indexed vault);
    }

    #[sol(rpc)]
    interface IAavePool {
        struct ReserveData {
            uint256 configuration;
            uint128 liquidityIndex;
            uint128 currentLiquidityRate;
            uint128 variableBorrowIndex;
            uint128 currentVariableBorrowRate;
            uint128 currentStableBorrowRate;
            uint40 lastUpdateTimestamp;
            uint16 id;
            address aTokenAddress;
            address stableDebtTokenAddress;
            address variableDebtTokenAddress;
            address interestRateStrategyAddress;
            uint128 accruedToTreasury;
            uint128 unbacked;
            uint128 isolationModeTotalDebt;
        }

        function getReservesList() external view returns (address[] memory);
        function getReserveData(address asset) external view returns (ReserveData memory);
    }

    #[sol(rpc)]
    interface ICompoundComet {
        function getUtilization() external view returns (uint256);
        function getSupplyRate(uint256 utilization) external view returns (uint64);
        function symbol() external view returns (string memory);
        function balanceOf(address account) external view returns (uint256);
    }

    #[sol(rpc)]
    interface IERC20Metadata {
        function symbol() external view returns (string memory);
        function decimals() external view returns (uint8);
    }
}
