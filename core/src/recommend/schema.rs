//! Target schemas embedded in payload-synthesis prompts.
//!
//! Notation: `jsonName: type  [xml]`. `@attr` is an XML attribute, `<A><B>` a wrapper
//! element holding repeated children. Every member is optional.

/// Request record accepted by every catalog endpoint
pub const REQUEST_SCHEMA: &str = r#"Request                          [root element, xmlns:token attribute]
  source: BusinessIdentifier[]     [<Source><BusinessIdentifiers><BusinessIdentifier>]
  destination: BusinessIdentifier[] [<Destination><BusinessIdentifiers><BusinessIdentifier>]
  context: Context                 [<Context>]
  payload: Payload                 [<Payload>]
  signature: string                [@signature]

BusinessIdentifier
  type, id, publicKey, signature, callbackUrl: string   [@attr]
  account: Account[]               [<Accounts><Account>]
  meta: Meta                       [<Meta>]

Account
  type, address, vpa: string       [@attr]

Context
  requestId, msgId, idempotencyKey, networkId, wrapperContract, contractName,
  methodName, sender, receiver, timestamp, purpose, prodType, collection, type,
  version, subtype, action, traceDetails, originalRequestId, originalTimestamp,
  secureToken, status, code: string [@attr]
  isAsync, isUMICompliant: bool    [@attr]
  meta: Meta                       [<Meta>]

Payload
  type: string                     [@type]
  tokenizedAsset: TokenizedAsset[] [<TokenizedAssets><TokenizedAsset>]
  transaction: Transaction[]       [<Transactions><Transaction>]
  identity: Identity[]             [<Identities><Identity>]
  keyValue: Detail[]               [<KeyValue><Detail>]
  meta: Meta                       [<Meta>]

TokenizedAsset
  version, id, value, unit, creationTimestamp, issuerSignature, issuerAddress,
  custodianAddress, ownerAddress, type, serialNumber, tag, parentId, status: string [@attr]
  meta: Meta                       [<Meta>]

Transaction
  id, type, category, creationTimestamp, status, publisherName, publisherVPA,
  publisherWalletAddress, publisherSignature, publisherLogoUrl,
  termsAndConditionsUrl: string    [@attr]
  data: Data                       [<Data>]

Data
  type: string                     [@type]
  tokenizedAsset: TokenizedAsset[] [<TokenizedAssets><TokenizedAsset>]
  keyValue: Detail[]               [<KeyValue><Detail>]
  meta: Meta                       [<Meta>]

Identity
  type, id, category, creationTimestamp, lastUpdateTimestamp, status, issuer,
  entityType, password, alias, networkAlias, organisationAlias, certificate,
  endpoint, bridgeAlias, netId, layer, custodyType: string [@attr]

Meta
  name, tenure, tenureUnit, interval, intervalUnit, interest, interestUnit,
  tdsFee, tdsFeeUnit, preMatureWithdrawalFee, preMatureWithdrawalFeeUnit,
  switchFee, switchFeeUnit, interestType, nomineeName, nomineeRelation,
  walletAddress, toWalletAddress, fromWalletAddress, toCustodianAddress,
  fromCustodianAddress, vpa, toVpa, fromVpa, userVpa, marketplaceId, orgId,
  mspId, routingMode, paymentRefId, paymentMsgId, paymentVpa, paymentMode,
  paymentDate, interestAccrued, interestAccruedUnit, interestPaid,
  interestPaidUnit, payoutAmount, payoutAmountUnit, clientId, signalDetails, id,
  queryType, collectionName, payloadRequired, payload, payloadType,
  paymentAmount, validTill, templateId, expiryDate, useCaseId, lockedBy,
  lockedFor, quantity, contentType: string [@attr]
  details: Detail[]                [<Details><Detail>]

Detail
  name, value: string              [@attr]"#;

/// Event record delivered to the backend on async flows
pub const EVENT_SCHEMA: &str = r#"Event
  id, type, eventType, category, timestamp, creationTimestamp, status,
  description, source, destination, data: string [@attr]
  meta: Meta                       [<Meta>]"#;
