//! ABI of the membership party contract

use alloy_sol_types::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IPartyMembership {
        function owner() external view returns (address);

        function partyCount() external view returns (uint256);

        function parties(uint256 index)
            external
            view
            returns (string name, uint256 joinFee, uint256 memberCount, uint256 totalContributions);

        function isMember(uint256 partyId, address member) external view returns (bool);

        function memberTokens(address member, uint256 partyId) external view returns (uint256);

        function tokenURI(uint256 tokenId) external view returns (string);

        function createParty(string name, uint256 joinFee) external;

        function payContributionToJoinParty(uint256 partyId) external payable;

        function withdrawContributions(uint256 partyId, address recipient) external;
    }
}
