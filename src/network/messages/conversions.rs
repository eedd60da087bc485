use crate::chord::types::{FindSuccessorCommand, RoutingInfo, SuccessorResponse};
use crate::error::MessageError;
use crate::network::messages::chord::{FindSuccessorRequest, FindSuccessorResponse, NodeInfo};

impl From<RoutingInfo> for NodeInfo {
    fn from(info: RoutingInfo) -> Self {
        NodeInfo {
            address: info.address,
            digest: info.digest,
            parent_digest: info.parent_digest,
        }
    }
}

impl From<NodeInfo> for RoutingInfo {
    fn from(info: NodeInfo) -> Self {
        RoutingInfo {
            address: info.address,
            digest: info.digest,
            parent_digest: info.parent_digest,
        }
    }
}

impl From<FindSuccessorCommand> for FindSuccessorRequest {
    fn from(cmd: FindSuccessorCommand) -> Self {
        FindSuccessorRequest {
            request_id: cmd.request_id,
            initiator: Some(cmd.initiator.into()),
            recipient: Some(cmd.recipient.into()),
            search_digest: cmd.search_digest,
            hops: cmd.hops,
        }
    }
}

impl TryFrom<FindSuccessorRequest> for FindSuccessorCommand {
    type Error = MessageError;

    fn try_from(req: FindSuccessorRequest) -> Result<Self, Self::Error> {
        let initiator = req
            .initiator
            .ok_or_else(|| MessageError::InvalidFormat("find successor without initiator".into()))?;
        let recipient = req
            .recipient
            .ok_or_else(|| MessageError::InvalidFormat("find successor without recipient".into()))?;
        Ok(FindSuccessorCommand {
            request_id: req.request_id,
            initiator: initiator.into(),
            recipient: recipient.into(),
            search_digest: req.search_digest,
            hops: req.hops,
        })
    }
}

impl From<SuccessorResponse> for FindSuccessorResponse {
    fn from(resp: SuccessorResponse) -> Self {
        FindSuccessorResponse {
            request_id: resp.request_id,
            search_digest: resp.search_digest,
            successor: Some(resp.successor.into()),
            hops: resp.hops,
        }
    }
}

impl From<FindSuccessorResponse> for SuccessorResponse {
    fn from(resp: FindSuccessorResponse) -> Self {
        // A response without a successor decodes to the "no answer" sentinel.
        SuccessorResponse {
            request_id: resp.request_id,
            search_digest: resp.search_digest,
            successor: resp.successor.map(RoutingInfo::from).unwrap_or_default(),
            hops: resp.hops,
        }
    }
}
