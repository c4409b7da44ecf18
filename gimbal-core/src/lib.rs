pub mod channel;
pub mod command;
pub mod cursor;
pub mod error;
pub mod packet;
pub mod qpoint;
pub mod report;

pub use channel::{CHANNEL_COUNT, Channel, SequenceNumbers};
pub use command::FeatureCommand;
pub use cursor::PayloadCursor;
pub use error::{ParseResult, ProtocolError};
pub use packet::{HEADER_SIZE, MAX_PAYLOAD_SIZE, Packet, PacketHeader};
pub use qpoint::{QPoints, q_to_f32};
pub use report::{
    ControlResponse, InputReport, RawQuaternion, RawVector, ReportBody, SensorReportId,
};
