//! Modbus TCP controller link
//!
//! Deliberately minimal: the session machine needs read-coils, write-single-
//! coil, and write-single-register, so that is the whole client. This is not
//! a general fieldbus library.
//!
//! Framing is the standard MBAP header (transaction id, protocol 0, length,
//! unit id) followed by the function PDU. Transaction ids are checked on
//! every response; an exception response (function | 0x80) or any framing
//! surprise surfaces as a [`LinkError`] and tears the link down for the
//! supervisor to rebuild.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use reeltally_core::{ControllerConfig, LinkError};
use reeltally_runtime::{ControllerConnector, ControllerLink};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

const FN_READ_COILS: u8 = 0x01;
const FN_WRITE_SINGLE_COIL: u8 = 0x05;
const FN_WRITE_SINGLE_REGISTER: u8 = 0x06;

const COIL_ON: u16 = 0xFF00;
const COIL_OFF: u16 = 0x0000;

const MBAP_LEN: usize = 7;
const PROTOCOL_ID: u16 = 0;

// ----------------------------------------------------------------------------
// Frame Codec
// ----------------------------------------------------------------------------

/// Encode one request frame: MBAP header plus a `function + 4 data bytes` PDU
fn encode_request(transaction: u16, unit_id: u8, function: u8, data: [u8; 4]) -> [u8; 12] {
    let mut frame = [0u8; 12];
    frame[0..2].copy_from_slice(&transaction.to_be_bytes());
    frame[2..4].copy_from_slice(&PROTOCOL_ID.to_be_bytes());
    // Length counts unit id + PDU.
    frame[4..6].copy_from_slice(&6u16.to_be_bytes());
    frame[6] = unit_id;
    frame[7] = function;
    frame[8..12].copy_from_slice(&data);
    frame
}

/// Validate an MBAP response header and return the remaining byte count
fn decode_header(header: &[u8; MBAP_LEN], expected_transaction: u16) -> Result<usize, LinkError> {
    let transaction = u16::from_be_bytes([header[0], header[1]]);
    if transaction != expected_transaction {
        return Err(LinkError::TransactionMismatch {
            expected: expected_transaction,
            got: transaction,
        });
    }
    let protocol = u16::from_be_bytes([header[2], header[3]]);
    if protocol != PROTOCOL_ID {
        return Err(LinkError::BadFrame(format!("protocol id {protocol}")));
    }
    let length = u16::from_be_bytes([header[4], header[5]]) as usize;
    // Length counts the unit id byte already consumed with the header.
    if length < 2 {
        return Err(LinkError::BadFrame(format!("length field {length}")));
    }
    Ok(length - 1)
}

/// Check the response PDU against the requested function, mapping exception
/// frames to errors, and return the data bytes
fn decode_pdu(pdu: &[u8], function: u8) -> Result<&[u8], LinkError> {
    let (&got, data) = pdu
        .split_first()
        .ok_or_else(|| LinkError::BadFrame("empty PDU".to_string()))?;
    if got == function | 0x80 {
        let code = data.first().copied().unwrap_or(0);
        return Err(LinkError::Exception { function, code });
    }
    if got != function {
        return Err(LinkError::BadFrame(format!(
            "function {got:#04x} in response to {function:#04x}"
        )));
    }
    Ok(data)
}

// ----------------------------------------------------------------------------
// Client
// ----------------------------------------------------------------------------

/// One Modbus TCP connection to the controller
pub struct ModbusLink {
    stream: TcpStream,
    unit_id: u8,
    transaction: u16,
}

impl ModbusLink {
    pub async fn connect(host: &str, port: u16, unit_id: u8) -> Result<Self, LinkError> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        info!(host, port, "controller connected");
        Ok(Self {
            stream,
            unit_id,
            transaction: 0,
        })
    }

    async fn transact(&mut self, function: u8, data: [u8; 4]) -> Result<Vec<u8>, LinkError> {
        self.transaction = self.transaction.wrapping_add(1);
        let request = encode_request(self.transaction, self.unit_id, function, data);
        self.stream.write_all(&request).await?;

        let mut header = [0u8; MBAP_LEN];
        self.stream.read_exact(&mut header).await?;
        let remaining = decode_header(&header, self.transaction)?;
        let mut pdu = vec![0u8; remaining];
        self.stream.read_exact(&mut pdu).await?;

        decode_pdu(&pdu, function).map(<[u8]>::to_vec)
    }
}

#[async_trait]
impl ControllerLink for ModbusLink {
    async fn read_coil(&mut self, address: u16) -> Result<bool, LinkError> {
        let mut data = [0u8; 4];
        data[0..2].copy_from_slice(&address.to_be_bytes());
        data[2..4].copy_from_slice(&1u16.to_be_bytes());
        let response = self.transact(FN_READ_COILS, data).await?;
        // byte count, then packed coil bits
        match response.split_first() {
            Some((&count, bits)) if count as usize == bits.len() && !bits.is_empty() => {
                Ok(bits[0] & 0x01 != 0)
            }
            _ => Err(LinkError::BadFrame("read coils response".to_string())),
        }
    }

    async fn write_coil(&mut self, address: u16, value: bool) -> Result<(), LinkError> {
        debug!(address, value, "write coil");
        let raw = if value { COIL_ON } else { COIL_OFF };
        let mut data = [0u8; 4];
        data[0..2].copy_from_slice(&address.to_be_bytes());
        data[2..4].copy_from_slice(&raw.to_be_bytes());
        self.transact(FN_WRITE_SINGLE_COIL, data).await?;
        Ok(())
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), LinkError> {
        debug!(address, value, "write register");
        let mut data = [0u8; 4];
        data[0..2].copy_from_slice(&address.to_be_bytes());
        data[2..4].copy_from_slice(&value.to_be_bytes());
        self.transact(FN_WRITE_SINGLE_REGISTER, data).await?;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Connector
// ----------------------------------------------------------------------------

/// Builds [`ModbusLink`]s for the supervisor's reconnect loop
pub struct ModbusConnector {
    config: ControllerConfig,
}

impl ModbusConnector {
    pub fn new(config: ControllerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ControllerConnector for ModbusConnector {
    type Link = ModbusLink;

    async fn connect(&self) -> Result<ModbusLink, LinkError> {
        ModbusLink::connect(&self.config.host, self.config.port, self.config.unit_id).await
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
