use std::io;

use super::{ClientGccBlocks, GccError, ServerGccBlocks};
use crate::{mcs, per, PduParsing};

const CONFERENCE_REQUEST_OBJECT_ID: [u8; 6] = [0, 0, 20, 124, 0, 1];
const CONFERENCE_REQUEST_CLIENT_TO_SERVER_H221_NON_STANDARD: &[u8; 4] = b"Duca";
const CONFERENCE_REQUEST_SERVER_TO_CLIENT_H221_NON_STANDARD: &[u8; 4] = b"McDn";
const CONFERENCE_REQUEST_U16_MIN: u16 = 1001;

const CONFERENCE_REQUEST_CONNECT_PDU_SIZE: u16 = 12;
const CONFERENCE_RESPONSE_CONNECT_PDU_SIZE: u16 = 13;
const OBJECT_IDENTIFIER_KEY: u8 = 0;
const CONNECT_GCC_PDU_CONFERENCE_REQUEST_CHOICE: u8 = 0;
const CONNECT_GCC_PDU_CONFERENCE_RESPONSE_CHOICE: u8 = 0x14;
const CONFERENCE_REQUEST_USER_DATA_SELECTION: u8 = 8;
const USER_DATA_NUMBER_OF_SETS: u8 = 1;
const USER_DATA_H221_NON_STANDARD_CHOICE: u8 = 0xc0;
const CONFERENCE_RESPONSE_TAG: u32 = 1;
const CONFERENCE_RESPONSE_RESULT: u8 = 0;
const H221_NON_STANDARD_MIN_LENGTH: usize = 4;
const CONFERENCE_NAME: &[u8] = b"1";

/// The T.124 conference-create request wrapping the client GCC blocks inside
/// the MCS Connect-Initial user data.
#[derive(Clone, Debug, PartialEq)]
pub struct ConferenceCreateRequest {
    pub gcc_blocks: ClientGccBlocks,
}

impl PduParsing for ConferenceCreateRequest {
    type Error = GccError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        // ConnectData::Key: select object (0) of type OBJECT_IDENTIFIER
        if per::read_choice(&mut stream)? != OBJECT_IDENTIFIER_KEY {
            return Err(GccError::InvalidConferenceCreateRequest(String::from(
                "got unexpected ConnectData key",
            )));
        }
        if per::read_object_id(&mut stream)? != CONFERENCE_REQUEST_OBJECT_ID {
            return Err(GccError::InvalidConferenceCreateRequest(String::from(
                "got unexpected ConnectData key value",
            )));
        }

        let _length = per::read_length(&mut stream)?;
        if per::read_choice(&mut stream)? != CONNECT_GCC_PDU_CONFERENCE_REQUEST_CHOICE {
            return Err(GccError::InvalidConferenceCreateRequest(String::from(
                "got invalid ConnectGCCPDU choice (expected ConferenceCreateRequest)",
            )));
        }
        if per::read_selection(&mut stream)? != CONFERENCE_REQUEST_USER_DATA_SELECTION {
            return Err(GccError::InvalidConferenceCreateRequest(String::from(
                "got invalid ConferenceCreateRequest selection (expected UserData)",
            )));
        }
        per::read_numeric_string(&mut stream, 1)?; // ConferenceName
        per::read_padding(&mut stream, 1)?;

        if per::read_number_of_sets(&mut stream)? != USER_DATA_NUMBER_OF_SETS {
            return Err(GccError::InvalidConferenceCreateRequest(String::from(
                "got invalid ConferenceCreateRequest number of sets (expected 1)",
            )));
        }
        if per::read_choice(&mut stream)? != USER_DATA_H221_NON_STANDARD_CHOICE {
            return Err(GccError::InvalidConferenceCreateRequest(String::from(
                "expected UserData H221NonStandard choice",
            )));
        }
        if per::read_octet_string(&mut stream, H221_NON_STANDARD_MIN_LENGTH)?
            != CONFERENCE_REQUEST_CLIENT_TO_SERVER_H221_NON_STANDARD
        {
            return Err(GccError::InvalidConferenceCreateRequest(String::from(
                "got invalid H221NonStandard client-to-server key",
            )));
        }
        let (_gcc_blocks_buffer_length, _) = per::read_length(&mut stream)?;
        let gcc_blocks = ClientGccBlocks::from_buffer(&mut stream)?;

        Ok(Self { gcc_blocks })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        let gcc_blocks_buffer_length = self.gcc_blocks.buffer_length();

        per::write_choice(&mut stream, OBJECT_IDENTIFIER_KEY)?;
        per::write_object_id(&mut stream, CONFERENCE_REQUEST_OBJECT_ID)?;

        per::write_length(
            &mut stream,
            gcc_blocks_buffer_length as u16 + CONFERENCE_REQUEST_CONNECT_PDU_SIZE,
        )?;
        per::write_choice(&mut stream, CONNECT_GCC_PDU_CONFERENCE_REQUEST_CHOICE)?;
        per::write_selection(&mut stream, CONFERENCE_REQUEST_USER_DATA_SELECTION)?;
        per::write_numeric_string(&mut stream, CONFERENCE_NAME, 1)?;
        per::write_padding(&mut stream, 1)?;
        per::write_number_of_sets(&mut stream, USER_DATA_NUMBER_OF_SETS)?;
        per::write_choice(&mut stream, USER_DATA_H221_NON_STANDARD_CHOICE)?;
        per::write_octet_string(
            &mut stream,
            CONFERENCE_REQUEST_CLIENT_TO_SERVER_H221_NON_STANDARD,
            H221_NON_STANDARD_MIN_LENGTH,
        )?;
        per::write_length(&mut stream, gcc_blocks_buffer_length as u16)?;
        self.gcc_blocks.to_buffer(&mut stream)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        let gcc_blocks_buffer_length = self.gcc_blocks.buffer_length() as u16;
        per::SIZEOF_CHOICE
            + CONFERENCE_REQUEST_OBJECT_ID.len()
            + per::sizeof_length(CONFERENCE_REQUEST_CONNECT_PDU_SIZE + gcc_blocks_buffer_length)
            + CONFERENCE_REQUEST_CONNECT_PDU_SIZE as usize
            + per::sizeof_length(gcc_blocks_buffer_length)
            + gcc_blocks_buffer_length as usize
    }
}

/// The T.124 conference-create response with the server GCC blocks and the
/// conference node (user) id.
#[derive(Clone, Debug, PartialEq)]
pub struct ConferenceCreateResponse {
    pub user_id: u16,
    pub gcc_blocks: ServerGccBlocks,
}

impl PduParsing for ConferenceCreateResponse {
    type Error = GccError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        if per::read_choice(&mut stream)? != OBJECT_IDENTIFIER_KEY {
            return Err(GccError::InvalidConferenceCreateResponse(String::from(
                "got unexpected ConnectData key",
            )));
        }
        if per::read_object_id(&mut stream)? != CONFERENCE_REQUEST_OBJECT_ID {
            return Err(GccError::InvalidConferenceCreateResponse(String::from(
                "got invalid ConnectData value",
            )));
        }
        // connectPDU length must be ignored by the client
        let _length = per::read_length(&mut stream)?;
        if per::read_choice(&mut stream)? != CONNECT_GCC_PDU_CONFERENCE_RESPONSE_CHOICE {
            return Err(GccError::InvalidConferenceCreateResponse(String::from(
                "got unexpected ConnectGCCPDU choice",
            )));
        }
        let user_id = per::read_u16(&mut stream, CONFERENCE_REQUEST_U16_MIN)?;
        if per::read_u32(&mut stream)? != CONFERENCE_RESPONSE_TAG {
            return Err(GccError::InvalidConferenceCreateResponse(String::from(
                "got unexpected ConferenceCreateResponse tag",
            )));
        }
        if per::read_enum(&mut stream, mcs::RESULT_ENUM_LENGTH)? != CONFERENCE_RESPONSE_RESULT {
            return Err(GccError::InvalidConferenceCreateResponse(String::from(
                "got invalid ConferenceCreateResponse result",
            )));
        }
        if per::read_number_of_sets(&mut stream)? != USER_DATA_NUMBER_OF_SETS {
            return Err(GccError::InvalidConferenceCreateResponse(String::from(
                "got invalid ConferenceCreateResponse number of sets (expected 1)",
            )));
        }
        if per::read_choice(&mut stream)? != USER_DATA_H221_NON_STANDARD_CHOICE {
            return Err(GccError::InvalidConferenceCreateResponse(String::from(
                "got unexpected UserData choice (expected H221NonStandard)",
            )));
        }
        if per::read_octet_string(&mut stream, H221_NON_STANDARD_MIN_LENGTH)?
            != CONFERENCE_REQUEST_SERVER_TO_CLIENT_H221_NON_STANDARD
        {
            return Err(GccError::InvalidConferenceCreateResponse(String::from(
                "got invalid H221NonStandard server-to-client key",
            )));
        }
        let (_gcc_blocks_buffer_length, _) = per::read_length(&mut stream)?;
        let gcc_blocks = ServerGccBlocks::from_buffer(&mut stream)?;

        Ok(Self {
            user_id,
            gcc_blocks,
        })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        let gcc_blocks_buffer_length = self.gcc_blocks.buffer_length();

        per::write_choice(&mut stream, OBJECT_IDENTIFIER_KEY)?;
        per::write_object_id(&mut stream, CONFERENCE_REQUEST_OBJECT_ID)?;

        per::write_length(
            &mut stream,
            gcc_blocks_buffer_length as u16 + CONFERENCE_RESPONSE_CONNECT_PDU_SIZE,
        )?;
        per::write_choice(&mut stream, CONNECT_GCC_PDU_CONFERENCE_RESPONSE_CHOICE)?;
        per::write_u16(&mut stream, self.user_id, CONFERENCE_REQUEST_U16_MIN)?;
        per::write_u32(&mut stream, CONFERENCE_RESPONSE_TAG)?;
        per::write_enum(&mut stream, CONFERENCE_RESPONSE_RESULT)?;
        per::write_number_of_sets(&mut stream, USER_DATA_NUMBER_OF_SETS)?;
        per::write_choice(&mut stream, USER_DATA_H221_NON_STANDARD_CHOICE)?;
        per::write_octet_string(
            &mut stream,
            CONFERENCE_REQUEST_SERVER_TO_CLIENT_H221_NON_STANDARD,
            H221_NON_STANDARD_MIN_LENGTH,
        )?;
        per::write_length(&mut stream, gcc_blocks_buffer_length as u16)?;
        self.gcc_blocks.to_buffer(&mut stream)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        let gcc_blocks_buffer_length = self.gcc_blocks.buffer_length() as u16;
        per::SIZEOF_CHOICE
            + CONFERENCE_REQUEST_OBJECT_ID.len()
            + per::sizeof_length(CONFERENCE_RESPONSE_CONNECT_PDU_SIZE + gcc_blocks_buffer_length)
            + CONFERENCE_RESPONSE_CONNECT_PDU_SIZE as usize
            + per::sizeof_length(gcc_blocks_buffer_length)
            + gcc_blocks_buffer_length as usize
    }
}
